fn main() {
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os != "windows" {
        return;
    }

    let icon_path = "../assets/upkiller.ico";
    println!("cargo:rerun-if-changed={icon_path}");
    if !std::path::Path::new(icon_path).exists() {
        println!(
            "cargo:warning=upkiller-core: Windows icon missing at {icon_path}; continuing without embedded icon"
        );
        return;
    }

    let mut res = winres::WindowsResource::new();
    res.set_icon(icon_path);
    res.set("ProductName", "UpKiller");
    if let Err(error) = res.compile() {
        println!("cargo:warning=upkiller-core: failed to compile Windows resources: {error}");
    }
}
