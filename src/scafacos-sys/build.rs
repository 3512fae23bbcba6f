use std::env;
use std::path::PathBuf;

// Locates the ScaFaCoS installation and emits link flags for it.
//
// Search order:
//
// 1. `SCAFACOS_DIR`, pointing at an installation prefix (`$SCAFACOS_DIR/lib`
//    must contain `libfcs`).
// 2. pkg-config, for installations that ship `scafacos.pc`.
//
// If neither succeeds, only a warning is printed.  Nothing in this crate
// references the declared symbols unless a dependent crate enables its
// linking feature, so downstream builds that never call into the library
// must not be failed here.
fn main() {
    println!("cargo:rerun-if-env-changed=SCAFACOS_DIR");

    if let Some(prefix) = env::var_os("SCAFACOS_DIR") {
        let libdir = PathBuf::from(prefix).join("lib");
        println!("cargo:rustc-link-search=native={}", libdir.display());
        println!("cargo:rustc-link-lib=fcs");
        return;
    }

    match pkg_config::probe_library("scafacos") {
        Ok(_) => {} // probe_library already emitted the flags
        Err(e) => {
            println!(
                "cargo:warning=scafacos-sys: no ScaFaCoS installation found \
                 (set SCAFACOS_DIR or install scafacos.pc); linking is deferred: {}",
                e,
            );
        }
    }
}
