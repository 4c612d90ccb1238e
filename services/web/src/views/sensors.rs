//! Sensor pages: list, detail, new and edit.

use std::fmt::Write;

use snowfinch_forms::{field_name, FormToggle, HostField, HostFieldList, RowField};
use snowfinch_id::{SensorId, SiteId};
use snowfinch_model::{SensorType, ValidationErrors};

use crate::db::{Matcher, SensorRecord, SensorSummary};
use crate::paths;
use crate::sensors::SensorForm;

use super::{escape_attr, escape_text, Page};

pub const EMPTY_LIST_MESSAGE: &str =
    "You don't have any sensors. Click \"Add a sensor\" to create one.";

/// What just happened to a sensor, for the flash notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeAction {
    Created,
    Updated,
    Removed,
}

impl NoticeAction {
    fn as_str(&self) -> &'static str {
        match self {
            NoticeAction::Created => "created",
            NoticeAction::Updated => "updated",
            NoticeAction::Removed => "removed",
        }
    }
}

/// `"Summer Discount" has been created.`
pub fn notice(name: &str, action: NoticeAction) -> String {
    format!("\"{name}\" has been {}.", action.as_str())
}

pub fn list(site_id: SiteId, sensors: &[SensorSummary]) -> Page {
    let mut body = String::new();
    if sensors.is_empty() {
        let _ = writeln!(body, "<p class=\"empty\">{}</p>", escape_text(EMPTY_LIST_MESSAGE));
    } else {
        body.push_str("<ul class=\"sensors\">\n");
        for sensor in sensors {
            let _ = writeln!(
                body,
                "<li class=\"{}\"><a href=\"{}\">{}</a></li>",
                sensor.sensor_type.as_str(),
                escape_attr(&paths::sensor(site_id, sensor.id)),
                escape_text(&sensor.name)
            );
        }
        body.push_str("</ul>\n");
    }
    let _ = writeln!(
        body,
        "<p><a href=\"{}\" class=\"add_sensor\">Add a sensor</a></p>",
        escape_attr(&paths::new_sensor(site_id))
    );
    Page::new("Monitoring", body)
}

pub fn show(sensor: &SensorRecord) -> Page {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "<dl class=\"sensor\">\n<dt>Type</dt><dd>{}</dd>",
        sensor.sensor_type().label()
    );
    match &sensor.matcher {
        Matcher::Query { key, value } => {
            let _ = writeln!(body, "<dt>URI query key</dt><dd>{}</dd>", escape_text(key));
            let _ = writeln!(body, "<dt>URI query value</dt><dd>{}</dd>", escape_text(value));
        }
        Matcher::Referrer => {
            body.push_str("<dt>Referrer hosts</dt><dd><ul class=\"hosts\">\n");
            for host in &sensor.hosts {
                let _ = writeln!(body, "<li>{}</li>", escape_text(&host.host));
            }
            body.push_str("</ul></dd>\n");
        }
    }
    body.push_str("</dl>\n");
    let _ = writeln!(
        body,
        "<p><a href=\"{}\">Edit</a> | <a href=\"{}\">Monitoring</a></p>",
        escape_attr(&paths::edit_sensor(sensor.site_id, sensor.id)),
        escape_attr(&paths::sensors(sensor.site_id))
    );
    Page::new(sensor.name.clone(), body)
}

/// The new-sensor page, blank or re-rendered after a failed create.
pub fn new_form(site_id: SiteId, form: &SensorForm, errors: &ValidationErrors) -> Page {
    let action = paths::sensors(site_id);
    let body = sensor_forms(&action, form, errors);
    Page::new("Add a sensor", body).with_script(paths::SENSOR_FORM_SCRIPT)
}

pub fn edit_form(
    site_id: SiteId,
    sensor_id: SensorId,
    form: &SensorForm,
    errors: &ValidationErrors,
) -> Page {
    let action = paths::sensor(site_id, sensor_id);
    let mut body = sensor_forms(&action, form, errors);
    let _ = writeln!(
        body,
        "<form method=\"post\" action=\"{}\" class=\"remove_sensor\">\n<button type=\"submit\">Remove this sensor</button>\n</form>",
        escape_attr(&paths::remove_sensor(site_id, sensor_id))
    );
    let _ = writeln!(
        body,
        "<p><a href=\"{}\">Back</a></p>",
        escape_attr(&paths::sensor(site_id, sensor_id))
    );
    Page::new("Edit sensor", body).with_script(paths::SENSOR_FORM_SCRIPT)
}

fn sensor_forms(action: &str, form: &SensorForm, errors: &ValidationErrors) -> String {
    let toggle = FormToggle::showing(form.active_type());
    let mut body = String::new();

    body.push_str("<p class=\"sensor-toggles\">\n");
    for ty in SensorType::ALL {
        let _ = writeln!(
            body,
            "<a href=\"#\" id=\"{}_based_toggle\" class=\"{}\" data-sensor-toggle=\"{}\">{}</a>",
            ty.as_str(),
            toggle.toggle_class(ty),
            ty.as_str(),
            ty.label()
        );
    }
    body.push_str("</p>\n");

    for ty in SensorType::ALL {
        let style = if toggle.is_visible(ty) {
            ""
        } else {
            " style=\"display:none\""
        };
        let _ = writeln!(
            body,
            "<form id=\"{ty}_sensor_form\" data-sensor-form=\"{ty}\" method=\"post\" action=\"{}\"{style}>",
            escape_attr(action),
            ty = ty.as_str(),
        );
        if toggle.is_active(ty) {
            body.push_str(&error_summary(errors));
        }
        let _ = writeln!(
            body,
            "<input type=\"hidden\" name=\"type\" value=\"{}\">",
            ty.as_str()
        );
        text_field(&mut body, &format!("{}_sensor_name", ty.as_str()), "name", "Sensor name", &form.name);
        match ty {
            SensorType::Query => query_fields(&mut body, form),
            SensorType::Referrer => referrer_fields(&mut body, form),
        }
        body.push_str("<p><input type=\"submit\" name=\"commit\" value=\"Save\"></p>\n</form>\n");
    }

    body
}

fn error_summary(errors: &ValidationErrors) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let mut html = String::from("<div class=\"errors\">\n<ul>\n");
    for error in errors.iter() {
        let _ = writeln!(
            html,
            "<li data-field=\"{}\">{}</li>",
            escape_attr(&error.field),
            escape_text(&error.message)
        );
    }
    html.push_str("</ul>\n</div>\n");
    html
}

fn text_field(body: &mut String, id: &str, name: &str, label: &str, value: &str) {
    let _ = writeln!(
        body,
        "<p><label for=\"{id}\">{label}</label>\n<input type=\"text\" id=\"{id}\" name=\"{}\" value=\"{}\"></p>",
        escape_attr(name),
        escape_attr(value),
    );
}

fn query_fields(body: &mut String, form: &SensorForm) {
    text_field(body, "uri_query_key", "uri_query_key", "URI query key", &form.uri_query_key);
    text_field(
        body,
        "uri_query_value",
        "uri_query_value",
        "URI query value",
        &form.uri_query_value,
    );
}

fn referrer_fields(body: &mut String, form: &SensorForm) {
    let rows = HostFieldList::from_submitted(&form.hosts);

    // The page script numbers added rows from here on.
    let _ = writeln!(body, "<div id=\"referrers\" data-next-index=\"{}\">", rows.rows().len());
    for (index, row) in rows.rows().iter().enumerate() {
        referrer_row(body, &index.to_string(), Some(row));
    }
    body.push_str("</div>\n");

    body.push_str("<template id=\"referrer_template\">\n");
    referrer_row(body, "__INDEX__", None);
    body.push_str("</template>\n");
    body.push_str("<p><a href=\"#\" class=\"add_referrer\">Add a referrer</a></p>\n");
}

/// One `div.referrer`; `row` is `None` for the script's template row.
fn referrer_row(body: &mut String, index: &str, row: Option<&HostField>) {
    let host_name = field_name_at(index, RowField::Host);
    let input_id = format!("hosts_{index}_host");
    let destroyed = row.is_some_and(HostField::is_marked_for_destroy);
    let style = if destroyed { " style=\"display:none\"" } else { "" };

    let _ = writeln!(body, "<div class=\"referrer\"{style}>");
    let _ = writeln!(
        body,
        "<label for=\"{input_id}\">Referrer host</label>\n<input type=\"text\" id=\"{input_id}\" name=\"{}\" value=\"{}\">",
        escape_attr(&host_name),
        escape_attr(row.map(HostField::host).unwrap_or_default()),
    );

    match row.and_then(HostField::id) {
        Some(id) => {
            let checked = if destroyed { " checked" } else { "" };
            let _ = writeln!(
                body,
                "<input type=\"hidden\" name=\"{}\" value=\"{}\">\n<label><input type=\"checkbox\" class=\"destroy_referrer\" name=\"{}\" value=\"1\"{checked}> remove</label>",
                escape_attr(&field_name_at(index, RowField::Id)),
                escape_attr(id),
                escape_attr(&field_name_at(index, RowField::Destroy)),
            );
        }
        None => body.push_str("<a href=\"#\" class=\"remove_referrer\">remove</a>\n"),
    }
    body.push_str("</div>\n");
}

fn field_name_at(index: &str, field: RowField) -> String {
    match index.parse::<usize>() {
        Ok(i) => field_name(i, field),
        Err(_) => format!("hosts[{index}][{}]", field.as_str()),
    }
}
