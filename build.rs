// Build metadata shown by `sd version`
fn main() {
    let built_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    println!("cargo:rustc-env=BUILD_DATE={}", built_at);

    // Git hash and the rest of the build environment end up in $OUT_DIR/built.rs
    if let Err(e) = built::write_built_file() {
        panic!("Failed to record build information: {}", e);
    }
}
