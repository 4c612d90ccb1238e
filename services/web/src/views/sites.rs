//! Site pages.

use std::fmt::Write;

use crate::db::SiteRecord;
use crate::paths;

use super::{escape_attr, escape_text, Page};

pub fn index(sites: &[SiteRecord]) -> Page {
    let mut body = String::new();
    if sites.is_empty() {
        body.push_str("<p class=\"empty\">There are no sites yet.</p>\n");
    } else {
        body.push_str("<ul class=\"sites\">\n");
        for site in sites {
            let _ = writeln!(
                body,
                "<li><a href=\"{}\">{}</a></li>",
                escape_attr(&paths::site(site.id)),
                escape_text(&site.name)
            );
        }
        body.push_str("</ul>\n");
    }
    Page::new("Sites", body)
}

pub fn show(site: &SiteRecord) -> Page {
    let body = format!(
        "<ul class=\"site-sections\">\n<li><a href=\"{}\">Monitoring</a></li>\n</ul>\n",
        escape_attr(&paths::sensors(site.id))
    );
    Page::new(site.name.clone(), body)
}
