/*
 * Responsibility
 * - リクエスト認証 middleware (Basic / Bearer)
 * - scheme 判定 → allow-list → credential 抽出 → 検証 → hook
 * - 成功時に AuthContext を request extensions に載せる
 */
pub mod config;
pub mod error;
pub mod hooks;
pub mod lookup;
mod middleware;
pub mod result;
pub mod schema;
pub mod verify;

pub use config::{AuthConfig, AuthConfigBuilder, parse_algorithm};
pub use error::{AuthConfigError, AuthError, Rejection};
pub use hooks::{AllowAnonymous, PathFilter};
pub use lookup::TokenLookup;
pub use middleware::{apply, authenticate};
pub use result::{AuthContext, AuthResult, Authenticated, Claims, Identity, MaybeAuthenticated};
pub use schema::AuthSchema;
pub use verify::{SigningKey, TokenConstraints};
