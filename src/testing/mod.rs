//! Testing utilities shared by unit and integration tests
//!
//! - [`fixtures`] - Pre-built users, token bundles, settings and handlers
//! - [`mock`] - In-memory identity service and success hooks
//! - [`requests`] - Callback request builders
//!
//! ```rust
//! use authkit_callback::testing::{fixtures::TestFixtures, mock::MockIdentityService};
//! use std::sync::Arc;
//!
//! let identity = Arc::new(MockIdentityService::succeeding(
//!     TestFixtures::authentication_response(),
//! ));
//! let handler = TestFixtures::callback_handler(identity, Default::default());
//! ```

pub mod fixtures;
pub mod mock;
pub mod requests;

pub use fixtures::TestFixtures;
pub use mock::{FailingHook, MockIdentityService, RecordingHook};
pub use requests::RequestBuilder;

/// Common test constants
pub mod constants {
    /// Public origin the test handler resolves redirects against
    pub const TEST_BASE_URL: &str = "https://app.example.com";

    pub const TEST_CLIENT_ID: &str = "client_01TESTCLIENT";

    pub const TEST_API_KEY: &str = "sk_test_key";

    /// 40 characters, above the minimum cookie password length
    pub const TEST_COOKIE_PASSWORD: &str = "test-cookie-password-of-forty-characters";

    pub const TEST_USER_ID: &str = "user_01TESTUSER";

    pub const TEST_EMAIL: &str = "test@example.com";

    pub const TEST_ACCESS_TOKEN: &str = "test_access_token";

    pub const TEST_REFRESH_TOKEN: &str = "test_refresh_token";

    pub const TEST_CODE: &str = "01TESTAUTHCODE";
}
