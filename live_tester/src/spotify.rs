// Spotify Web API adapter for the playback trigger.
//
// Only a ready-made access token is supported (`SPOTIFY_ACCESS_TOKEN`); obtaining
// one through OAuth is left to the user. The token needs the
// `user-read-playback-state` and `user-modify-playback-state` scopes.

use anyhow::{Context, Result};
use grip_vision::core_modules::dispatcher::{PlaybackError, PlaybackTarget};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const API_BASE: &str = "https://api.spotify.com/v1/me/player";

#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
struct DeviceList {
    devices: Vec<Device>,
}

#[derive(Debug, Deserialize)]
struct PlayingItem {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct CurrentPlayback {
    #[serde(default)]
    is_playing: bool,
    item: Option<PlayingItem>,
}

pub struct SpotifyPlayback {
    agent: ureq::Agent,
    token: String,
    device_id: Option<String>,
}

fn map_error(e: ureq::Error) -> PlaybackError {
    match e {
        ureq::Error::Status(404, _) => PlaybackError::NoActiveTarget,
        ureq::Error::Status(status, response) => PlaybackError::Rejected {
            status,
            message: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(t) => PlaybackError::Transport(t.to_string()),
    }
}

/// The configured device if it is listed, otherwise the active one, otherwise the first.
fn choose_device<'a>(devices: &'a [Device], preferred: Option<&str>) -> Option<&'a Device> {
    let usable = || devices.iter().filter(|d| d.id.is_some());
    if let Some(wanted) = preferred {
        return usable().find(|d| d.id.as_deref() == Some(wanted));
    }
    usable().find(|d| d.is_active).or_else(|| usable().next())
}

fn already_playing(current: Option<&CurrentPlayback>, track: &str) -> bool {
    match current {
        Some(CurrentPlayback { is_playing: true, item: Some(item) }) => item.uri == track,
        _ => false,
    }
}

impl SpotifyPlayback {
    /// Reads `SPOTIFY_ACCESS_TOKEN` and the optional `SPOTIFY_DEVICE_ID`.
    pub fn from_env(timeout: Duration) -> Result<Self> {
        let token = std::env::var("SPOTIFY_ACCESS_TOKEN").context("SPOTIFY_ACCESS_TOKEN is not set")?;
        let device_id = std::env::var("SPOTIFY_DEVICE_ID").ok().filter(|id| !id.trim().is_empty());
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Ok(Self { agent, token, device_id })
    }

    fn auth(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn devices(&self) -> Result<Vec<Device>, PlaybackError> {
        let response = self
            .agent
            .get(&format!("{API_BASE}/devices"))
            .set("Authorization", &self.auth())
            .call()
            .map_err(map_error)?;
        let list: DeviceList = response.into_json().map_err(|e| PlaybackError::Transport(e.to_string()))?;
        Ok(list.devices)
    }

    /// `None` when nothing is loaded on any device (HTTP 204).
    fn current_playback(&self) -> Result<Option<CurrentPlayback>, PlaybackError> {
        let response = self
            .agent
            .get(API_BASE)
            .set("Authorization", &self.auth())
            .call()
            .map_err(map_error)?;
        if response.status() == 204 {
            return Ok(None);
        }
        response
            .into_json()
            .map(Some)
            .map_err(|e| PlaybackError::Transport(e.to_string()))
    }
}

impl PlaybackTarget for SpotifyPlayback {
    fn has_active_target(&self) -> bool {
        match self.devices() {
            Ok(devices) => choose_device(&devices, self.device_id.as_deref()).is_some(),
            Err(e) => {
                warn!(error = %e, "could not list Spotify devices");
                false
            }
        }
    }

    fn start_playback(&mut self, track: &str) -> Result<(), PlaybackError> {
        match self.current_playback() {
            Ok(current) if already_playing(current.as_ref(), track) => {
                debug!(track, "track already playing, not restarting");
                return Ok(());
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "could not read current playback"),
        }

        let devices = self.devices()?;
        let device = choose_device(&devices, self.device_id.as_deref()).ok_or(PlaybackError::NoActiveTarget)?;
        let device_id = device.id.clone().unwrap_or_default();

        self.agent
            .put(&format!("{API_BASE}/play"))
            .query("device_id", &device_id)
            .set("Authorization", &self.auth())
            .send_json(ureq::json!({ "uris": [track] }))
            .map_err(map_error)?;

        info!(device = %device.name, "Spotify playback requested");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, active: bool) -> Device {
        Device {
            id: Some(id.to_string()),
            name: id.to_uppercase(),
            is_active: active,
        }
    }

    #[test]
    fn device_choice_prefers_configured_then_active() {
        let devices = vec![device("laptop", false), device("phone", true)];
        assert_eq!(choose_device(&devices, None).unwrap().name, "PHONE");
        assert_eq!(choose_device(&devices, Some("laptop")).unwrap().name, "LAPTOP");
        assert!(choose_device(&devices, Some("speaker")).is_none());
        assert_eq!(choose_device(&devices[..1], None).unwrap().name, "LAPTOP");
        assert!(choose_device(&[], None).is_none());
    }

    #[test]
    fn restricted_devices_without_an_id_are_skipped() {
        let devices = vec![Device {
            id: None,
            name: "cast group".into(),
            is_active: true,
        }];
        assert!(choose_device(&devices, None).is_none());
    }

    #[test]
    fn only_the_same_track_playing_counts() {
        let playing: CurrentPlayback =
            serde_json::from_str(r#"{"is_playing": true, "item": {"uri": "spotify:track:a"}}"#).unwrap();
        assert!(already_playing(Some(&playing), "spotify:track:a"));
        assert!(!already_playing(Some(&playing), "spotify:track:b"));

        let paused: CurrentPlayback =
            serde_json::from_str(r#"{"is_playing": false, "item": {"uri": "spotify:track:a"}}"#).unwrap();
        assert!(!already_playing(Some(&paused), "spotify:track:a"));
        assert!(!already_playing(None, "spotify:track:a"));
    }
}
