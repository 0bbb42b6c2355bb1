//! HTTP request handlers
//!
//! Numeric fields are read leniently, the way form inputs arrive: numbers,
//! numeric strings, or garbage. Garbage is coerced to a safe value by the
//! component that owns the setting rather than rejected.

use crate::api::server::AppContext;
use crate::catalog::SoundId;
use crate::db::settings;
use crate::error::Error;
use crate::playback::PlaybackSnapshot;
use crate::timer::TimerSnapshot;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use soundpad_common::events::{ButtonInfo, SoundpadEvent};
use soundpad_common::time;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub git_hash: String,
    pub build_timestamp: String,
    pub build_profile: String,
}

#[derive(Debug, Serialize)]
pub struct ButtonsResponse {
    pub count: usize,
    pub buttons: Vec<ButtonInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ButtonCountRequest {
    #[serde(default)]
    pub count: Value,
}

#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    pub sound_id: String,
}

#[derive(Debug, Serialize)]
pub struct PlayResponse {
    pub sound_id: String,
    pub generation: u64,
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub stopped: bool,
}

#[derive(Debug, Deserialize)]
pub struct OptionsRequest {
    #[serde(default)]
    pub loop_enabled: bool,
    #[serde(default)]
    pub interval_seconds: Value,
}

#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    pub loop_enabled: bool,
    pub interval_seconds: f64,
}

#[derive(Debug, Deserialize)]
pub struct SpeedRequest {
    #[serde(default)]
    pub speed: Value,
}

#[derive(Debug, Serialize)]
pub struct SpeedResponse {
    pub speed: f32,
}

#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    #[serde(default)]
    pub volume: Value,
}

#[derive(Debug, Serialize)]
pub struct VolumeResponse {
    pub volume: f32,
}

#[derive(Debug, Serialize)]
pub struct DeviceListResponse {
    pub devices: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TimerRequest {
    #[serde(default)]
    pub minutes: Value,
}

type ApiError = (StatusCode, Json<StatusResponse>);

fn api_error(e: Error) -> ApiError {
    let status = match e {
        Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("Request failed: {}", e);
    }
    (
        status,
        Json(StatusResponse {
            status: format!("error: {}", e),
        }),
    )
}

/// Read a form-style number. Missing or unparseable values yield NaN.
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => f64::NAN,
    }
}

// ============================================================================
// Health
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "soundpad".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
    })
}

// ============================================================================
// Button Panel
// ============================================================================

/// GET /buttons
pub async fn get_buttons(State(ctx): State<AppContext>) -> Json<ButtonsResponse> {
    let buttons = ctx.state.buttons();
    Json(ButtonsResponse {
        count: buttons.len(),
        buttons,
    })
}

/// POST /buttons - regenerate the panel
pub async fn generate_buttons(
    State(ctx): State<AppContext>,
    Json(req): Json<ButtonCountRequest>,
) -> Result<Json<ButtonsResponse>, ApiError> {
    let buttons = ctx
        .panel
        .generate(coerce_number(&req.count))
        .await
        .map_err(api_error)?;

    Ok(Json(ButtonsResponse {
        count: buttons.len(),
        buttons,
    }))
}

// ============================================================================
// Playback
// ============================================================================

/// POST /playback/play
///
/// Returns as soon as the previous session is torn down; fetch and decode
/// continue in the background and report through SSE.
pub async fn play(
    State(ctx): State<AppContext>,
    Json(req): Json<PlayRequest>,
) -> Result<(StatusCode, Json<PlayResponse>), ApiError> {
    let id = SoundId::parse(&req.sound_id).map_err(api_error)?;

    // The session task logs its own outcome
    let (generation, _session) = ctx.controller.play(id);

    Ok((
        StatusCode::ACCEPTED,
        Json(PlayResponse {
            sound_id: id.to_string(),
            generation,
        }),
    ))
}

/// POST /playback/stop
pub async fn stop(State(ctx): State<AppContext>) -> Json<StopResponse> {
    Json(StopResponse {
        stopped: ctx.controller.stop(),
    })
}

/// GET /playback/state
pub async fn get_playback_state(State(ctx): State<AppContext>) -> Json<PlaybackSnapshot> {
    Json(ctx.controller.snapshot())
}

/// POST /playback/options - loop toggle and interval
pub async fn set_options(
    State(ctx): State<AppContext>,
    Json(req): Json<OptionsRequest>,
) -> Json<OptionsResponse> {
    let options = ctx
        .controller
        .set_options(req.loop_enabled, coerce_number(&req.interval_seconds));

    Json(OptionsResponse {
        loop_enabled: options.enabled,
        interval_seconds: options.interval.as_secs_f64(),
    })
}

/// GET /playback/speed
pub async fn get_speed(State(ctx): State<AppContext>) -> Json<SpeedResponse> {
    Json(SpeedResponse {
        speed: ctx.controller.speed(),
    })
}

/// POST /playback/speed - applies from the next playback start, persisted
pub async fn set_speed(
    State(ctx): State<AppContext>,
    Json(req): Json<SpeedRequest>,
) -> Result<Json<SpeedResponse>, ApiError> {
    let speed = ctx.controller.set_speed(coerce_number(&req.speed) as f32);

    settings::set_playback_speed(&ctx.db_pool, speed)
        .await
        .map_err(api_error)?;

    info!("Playback speed set to {}", speed);
    Ok(Json(SpeedResponse { speed }))
}

// ============================================================================
// Audio Output
// ============================================================================

/// GET /audio/volume
pub async fn get_volume(State(ctx): State<AppContext>) -> Json<VolumeResponse> {
    Json(VolumeResponse {
        volume: ctx.sink.gain(),
    })
}

/// POST /audio/volume - gain scalar, takes effect immediately
pub async fn set_volume(
    State(ctx): State<AppContext>,
    Json(req): Json<VolumeRequest>,
) -> Json<VolumeResponse> {
    let volume = ctx.sink.set_gain(coerce_number(&req.volume) as f32);

    ctx.state.broadcast_event(SoundpadEvent::VolumeChanged {
        volume,
        timestamp: time::now(),
    });

    Json(VolumeResponse { volume })
}

/// GET /audio/devices - list output devices
pub async fn list_audio_devices() -> Result<Json<DeviceListResponse>, ApiError> {
    use crate::audio::AudioOutput;

    // Device enumeration can block on some hosts
    let devices = tokio::task::spawn_blocking(AudioOutput::list_devices)
        .await
        .map_err(|e| api_error(Error::Internal(format!("Device listing task failed: {}", e))))?
        .map_err(|e| {
            warn!("Failed to list audio devices: {}", e);
            api_error(e)
        })?;

    Ok(Json(DeviceListResponse { devices }))
}

// ============================================================================
// Countdown Timer
// ============================================================================

/// GET /timer
pub async fn get_timer(State(ctx): State<AppContext>) -> Json<TimerSnapshot> {
    Json(ctx.timer.snapshot())
}

/// POST /timer - start a countdown; zero or garbage minutes cancels
pub async fn start_timer(
    State(ctx): State<AppContext>,
    Json(req): Json<TimerRequest>,
) -> Json<TimerSnapshot> {
    ctx.timer.start(coerce_number(&req.minutes));
    Json(ctx.timer.snapshot())
}

/// DELETE /timer
pub async fn cancel_timer(State(ctx): State<AppContext>) -> Json<TimerSnapshot> {
    ctx.timer.cancel();
    Json(ctx.timer.snapshot())
}
