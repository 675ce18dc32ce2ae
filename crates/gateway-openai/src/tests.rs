// Unit tests for the OpenAI-compatible driver.

use crate::OpenAiDriver;

#[test]
fn driver_with_api_key_redacts_in_debug() {
    let driver = OpenAiDriver::new("test-key");
    let debug = format!("{:?}", driver);
    assert!(debug.contains("OpenAiDriver"));
    assert!(!debug.contains("test-key"));
}

#[test]
fn driver_with_base_url_is_used_for_compatible_endpoints() {
    let driver = OpenAiDriver::with_base_url("test-key", "https://openrouter.ai/api/v1");
    assert!(format!("{:?}", driver).contains("openrouter"));
}
