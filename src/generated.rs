//! Protocol types generated from `proto/provider.proto` by the build script.
//!
//! The gRPC service trait is `provider_server::Provider`. Some message names
//! (`Schema`, `Diagnostic`, `Attribute`) shadow the crate's own types, so
//! always refer to these through the `generated::` path.

include!(concat!(env!("OUT_DIR"), "/glesys.provider.v1.rs"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_enums_accessible() {
        assert_eq!(diagnostic::Severity::Error as i32, 1);
        assert_eq!(nested_block::NestingMode::Set as i32, 3);
    }

    #[test]
    fn test_messages_default() {
        let response = ReadResponse::default();
        assert!(response.state.is_empty());
        assert!(response.diagnostics.is_empty());
    }
}
