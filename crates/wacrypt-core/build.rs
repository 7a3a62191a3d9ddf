fn main() -> Result<(), Box<dyn std::error::Error>> {
    let protoc_path = protoc_bin_vendored::protoc_bin_path()
        .expect("protoc-bin-vendored: no binary for this platform");
    std::env::set_var("PROTOC", protoc_path);

    // Header records only: backup.proto declares no services
    tonic_prost_build::configure()
        .build_client(false)
        .build_server(false)
        .compile_protos(&["src/proto/backup.proto"], &["src/proto"])?;

    println!("cargo:rerun-if-changed=src/proto/backup.proto");
    Ok(())
}
