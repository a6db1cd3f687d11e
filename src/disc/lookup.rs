//! Disc metadata lookup.
//!
//! The directory service is queried by disc fingerprint and answers with a
//! catalogue of releases → media → tracks. The medium whose disc list holds
//! the queried id is the one used. A service that only knows a CD stub for
//! the id returns a flat artist/title instead.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::config::DiscSettings;
use crate::error::{Result, SourceError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTrack {
    pub title: Option<String>,
    pub length_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    Release {
        artist: String,
        album: String,
        tracks: Vec<LookupTrack>,
    },
    Stub {
        artist: String,
        album: String,
    },
}

pub trait MetadataLookup: Send + Sync {
    fn lookup(&self, disc_id: &str) -> Result<LookupResult>;
}

pub struct MusicBrainzLookup {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl MusicBrainzLookup {
    pub fn new(settings: &DiscSettings) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(settings.lookup_user_agent.clone())
            .timeout(Duration::from_millis(settings.lookup_timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.lookup_base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl MetadataLookup for MusicBrainzLookup {
    fn lookup(&self, disc_id: &str) -> Result<LookupResult> {
        let url = format!(
            "{}/discid/{}?inc=artists+recordings&fmt=json",
            self.base_url, disc_id
        );
        debug!(%url, "querying disc metadata");
        let body = self.client.get(&url).send()?.error_for_status()?.text()?;
        let result = parse_response(&body, disc_id)?;
        info!(disc_id, "disc metadata found");
        Ok(result)
    }
}

#[derive(Debug, Deserialize)]
struct DiscResponse {
    #[serde(default)]
    releases: Vec<Release>,
    // CD stub shape
    title: Option<String>,
    artist: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Release {
    #[serde(default)]
    title: String,
    #[serde(default)]
    artist_credit: Vec<ArtistCredit>,
    #[serde(default)]
    media: Vec<Medium>,
}

#[derive(Debug, Deserialize)]
struct ArtistCredit {
    name: String,
    #[serde(default)]
    joinphrase: String,
}

#[derive(Debug, Deserialize)]
struct Medium {
    #[serde(default)]
    discs: Vec<DiscRef>,
    #[serde(default)]
    tracks: Vec<MediumTrack>,
}

#[derive(Debug, Deserialize)]
struct DiscRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MediumTrack {
    title: Option<String>,
    length: Option<u64>,
    recording: Option<Recording>,
}

#[derive(Debug, Deserialize)]
struct Recording {
    title: Option<String>,
    length: Option<u64>,
}

fn credit_phrase(credits: &[ArtistCredit]) -> String {
    credits
        .iter()
        .map(|c| format!("{}{}", c.name, c.joinphrase))
        .collect()
}

/// Pick the release/medium matching `disc_id`, or the stub's flat fields.
pub fn parse_response(body: &str, disc_id: &str) -> Result<LookupResult> {
    let response: DiscResponse = serde_json::from_str(body)?;

    for release in &response.releases {
        let matched = release
            .media
            .iter()
            .find(|m| m.discs.iter().any(|d| d.id == disc_id));
        if let Some(medium) = matched {
            let tracks = medium
                .tracks
                .iter()
                .map(|t| {
                    let rec = t.recording.as_ref();
                    LookupTrack {
                        title: rec.and_then(|r| r.title.clone()).or_else(|| t.title.clone()),
                        length_ms: rec.and_then(|r| r.length).or(t.length),
                    }
                })
                .collect();
            return Ok(LookupResult::Release {
                artist: credit_phrase(&release.artist_credit),
                album: release.title.clone(),
                tracks,
            });
        }
    }

    if response.releases.is_empty() {
        if let (Some(artist), Some(album)) = (response.artist, response.title) {
            return Ok(LookupResult::Stub { artist, album });
        }
    }

    Err(SourceError::ResourceUnavailable(format!(
        "no release matches disc {disc_id}"
    )))
}
