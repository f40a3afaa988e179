use hkmp_nav::NavigationHost;

/// Terminal stand-in for a browser: prints what a page would do.
pub(crate) struct PrintingHost;

impl NavigationHost for PrintingHost {
    fn launch_app(&self, app_uri: &str) {
        println!("launch app: {app_uri}");
    }

    fn open_web(&self, web_uri: &str) {
        println!("open web:   {web_uri}");
    }

    fn remove_surface(&self) {
        tracing::debug!("navigation surface removed");
    }
}
