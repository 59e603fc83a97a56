use std::{fs, io};

const PROTOS: &[&str] = &["./protos/raft.proto"];
const GENERATED_DIR: &str = "./generated/";

fn main() -> io::Result<()> {
    for proto in PROTOS {
        println!("cargo:rerun-if-changed={}", proto);
    }
    fs::create_dir_all(GENERATED_DIR)?;

    // Members both serve and call `GrpcRaftTransport`.
    tonic_build::configure()
        .build_client(true)
        .build_server(true)
        .out_dir(GENERATED_DIR)
        .compile(PROTOS, &["./protos/"])
}
