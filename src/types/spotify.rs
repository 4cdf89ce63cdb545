use serde::{Deserialize, Serialize};

/// `GET /me`
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyUser {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// One page of a Spotify paging object. `next` is an absolute URL or null.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<Option<T>>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub total: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimplePlaylist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumRef {
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Track {
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    pub album: AlbumRef,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayHistory {
    pub track: Track,
    pub played_at: String,
}

/// `GET /me/player/recently-played` (cursor-paged, we only read the first page).
#[derive(Debug, Clone, Deserialize)]
pub struct RecentlyPlayedResponse {
    #[serde(default = "Vec::new")]
    pub items: Vec<PlayHistory>,
}

/// Playlist row returned to the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_imported: bool,
}

/// Recently played row returned to the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentlyPlayedItem {
    pub track_name: String,
    pub artists: Vec<String>,
    pub album_name: String,
    pub played_at: String,
    pub external_url: Option<String>,
    pub album_art_url: Option<String>,
}

impl From<PlayHistory> for RecentlyPlayedItem {
    fn from(item: PlayHistory) -> Self {
        let PlayHistory { track, played_at } = item;
        Self {
            track_name: track.name,
            artists: track.artists.into_iter().map(|a| a.name).collect(),
            album_art_url: track.album.images.into_iter().next().map(|i| i.url),
            album_name: track.album.name,
            played_at,
            external_url: track.external_urls.spotify,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentlyPlayedList {
    pub recently_played: Vec<RecentlyPlayedItem>,
}
