//! Operator authentication
//!
//! Session tokens are the capability an operator presents to the event channel.
//! Identities come from an OAuth2 provider (Discord).

mod provider;
mod session;

pub use provider::{generate_oauth_state, DiscordProvider, IdentityProvider};
pub use session::{OperatorPrincipal, SessionClaims, SessionService};
