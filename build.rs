// Build script for the optional native Phonon SDK link
//
// The simulated runtime needs nothing from this script. With the `native`
// feature enabled the SDK library must be discoverable by the linker:
//   PHONON_SDK_LIB_DIR=/path/to/phonon/lib cargo build --features native

fn main() {
    println!("cargo:rerun-if-env-changed=PHONON_SDK_LIB_DIR");

    if std::env::var_os("CARGO_FEATURE_NATIVE").is_none() {
        return;
    }

    if let Ok(dir) = std::env::var("PHONON_SDK_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir);
    }

    // The Android SDK build is compiled against libc++_shared.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("android") {
        println!("cargo:rustc-link-lib=c++_shared");
    }
}
