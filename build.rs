fn main() {
    // Let a libpdfium.dylib shipped next to the embedding binary resolve at runtime.
    #[cfg(target_os = "macos")]
    {
        println!("cargo:rustc-link-arg=-Wl,-rpath,@executable_path/../Frameworks");
        println!("cargo:rustc-link-arg=-Wl,-rpath,@loader_path");
    }

    println!("cargo:rerun-if-changed=build.rs");
}
