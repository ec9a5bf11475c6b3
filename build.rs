fn main() {
    #[cfg(target_os = "windows")]
    {
        let mut res = winres::WindowsResource::new();
        res.set("FileDescription", "UserPulse");
        res.set("ProductName", "UserPulse");
        res.set("OriginalFilename", "userpulse.exe");
        res.set("InternalName", "userpulse");
        if let Err(e) = res.compile() {
            eprintln!("cargo:warning=failed to compile Windows resources: {e}");
        }
    }
}
