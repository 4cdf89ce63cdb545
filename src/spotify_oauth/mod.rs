pub mod endpoints;
pub mod token;

pub use endpoints::{SPOTIFY_SCOPES, SpotifyOauthEndpoints};
pub use token::TokenSet;
