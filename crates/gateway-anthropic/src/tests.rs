// Unit tests for the Anthropic driver.

use crate::AnthropicDriver;

#[test]
fn driver_with_api_key_redacts_in_debug() {
    let driver = AnthropicDriver::new("test-key");
    let debug = format!("{:?}", driver);
    assert!(debug.contains("AnthropicDriver"));
    assert!(!debug.contains("test-key"));
}

#[test]
fn driver_with_base_url_overrides_default() {
    let driver = AnthropicDriver::with_base_url("test-key", "https://staging.example.com");
    assert!(format!("{:?}", driver).contains("staging.example.com"));
}
