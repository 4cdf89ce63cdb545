pub mod spotify_link;
pub mod spotify_read;
