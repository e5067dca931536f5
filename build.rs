use std::fs;

fn main() {
    println!("cargo:rerun-if-changed=VERSION");

    let version = match fs::read_to_string("VERSION") {
        Ok(content) => content.trim().to_string(),
        Err(_) => {
            println!("cargo:warning=VERSION file not found, using package version");
            env!("CARGO_PKG_VERSION").to_string()
        }
    };

    println!("cargo:rustc-env=SSMBATCH_VERSION={}", version);
}
