//! Build script for the host protocol.
//!
//! Compiles `proto/provider.proto` into `$OUT_DIR/glesys.provider.v1.rs`,
//! which `src/generated.rs` includes. Only the server side is generated;
//! the host owns the client. Requires `protoc` on `PATH`, or its location
//! in the `PROTOC` environment variable.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_prost_build::configure()
        .build_client(false)
        .build_server(true)
        .compile_protos(&["proto/provider.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/provider.proto");

    Ok(())
}
