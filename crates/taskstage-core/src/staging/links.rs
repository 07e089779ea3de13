use std::sync::OnceLock;

use regex::Regex;

/// `DD.MM.YYYY F-Video_..._De-XX` delivery folder names, optional `-N` suffix
static DOWNLOAD_NAME: OnceLock<Regex> = OnceLock::new();

static HREF: OnceLock<Regex> = OnceLock::new();

fn download_name_regex() -> &'static Regex {
    DOWNLOAD_NAME.get_or_init(|| {
        Regex::new(
            r"(?x)
            (\d{2}\.\d{2}\.\d{4})       # date
            [-\ ]                       # separator
            (F-(?:Video|Static)
             (?:_[-\w+]+)+
             _De-[A-Z]{2,3})
            (?:-\d{1,2})?               # numeric suffix, dropped
            ",
        )
        .expect("download name pattern is valid")
    })
}

fn href_regex() -> &'static Regex {
    HREF.get_or_init(|| {
        Regex::new(r#"(?i)href\s*=\s*["'](https?://[^"']+)["']"#).expect("href pattern is valid")
    })
}

/// Delivery folder names mentioned in a task description, normalized to
/// `<date> <name>`.
pub fn extract_download_names(description: &str) -> Vec<String> {
    download_name_regex()
        .captures_iter(description)
        .map(|caps| format!("{} {}", &caps[1], &caps[2]))
        .collect()
}

/// Absolute http(s) link targets in an HTML description, in order, without
/// duplicates.
pub fn extract_hrefs(description: &str) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();
    for caps in href_regex().captures_iter(description) {
        let link = caps[1].replace("&amp;", "&");
        if !links.contains(&link) {
            links.push(link);
        }
    }
    links
}
