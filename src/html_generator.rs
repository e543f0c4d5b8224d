//! HTML stubs carried by INSERT and REPLACE patches, with consistent escaping.
//! Only the element itself is serialized; children arrive as their own INSERTs.
use crate::node::{CSS_CLASS_PROP, ElementKind, LAYOUT_OVERRIDE_PROP, Props};
use crate::types::SurfaceId;
use phf::phf_map;
use serde_json::Value;

// Compile-time widget tag lookup (zero allocation)
static WIDGET_TAGS: phf::Map<&'static str, &'static str> = phf_map! {
    "Text" => "p",
    "Image" => "img",
    "Icon" => "i",
    "Spacer" => "div",
    "SizedBox" => "div",
    "TextButton" => "button",
    "ElevatedButton" => "button",
    "IconButton" => "button",
    "FloatingActionButton" => "button",
    "SnackBarAction" => "button",
    "ListTile" => "div",
    "Divider" => "div",
    "Dialog" => "div",
    "AspectRatio" => "div",
    "ClipPath" => "div",
    "Positioned" => "div",
};

/// Consistent HTML attribute escaping
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

pub fn tag_for(kind: &ElementKind, props: &Props) -> &'static str {
    if *kind == ElementKind::Icon && str_prop(props, "render_type") == Some("img") {
        return "img";
    }
    WIDGET_TAGS.get(kind.name()).copied().unwrap_or("div")
}

fn str_prop<'a>(props: &'a Props, name: &str) -> Option<&'a str> {
    props.get(name).and_then(Value::as_str)
}

/// Numbers become pixel lengths, strings pass through.
fn css_length(value: &Value) -> String {
    match value.as_f64() {
        Some(num) => format!("{}px", num),
        None => value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string()),
    }
}

fn css_value(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

pub fn generate_html_stub(kind: &ElementKind, surface_id: &SurfaceId, props: &Props) -> String {
    let tag = tag_for(kind, props);
    let classes = html_escape(str_prop(props, CSS_CLASS_PROP).unwrap_or(""));
    let mut attrs = String::new();
    let mut inline_styles: Vec<String> = Vec::new();
    let mut inner_html = String::new();

    match kind {
        ElementKind::Text => {
            let text = match props.get("data") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            inner_html = html_escape(&text);
        }
        ElementKind::Icon => {
            if tag == "img" {
                attrs.push_str(&format!(
                    r#" src="{}" alt="{}""#,
                    html_escape(str_prop(props, "custom_icon_src").unwrap_or("")),
                    html_escape(str_prop(props, "data").unwrap_or(""))
                ));
            } else if let Some(icon_name) = str_prop(props, "data") {
                return format!(r#"<i id="{}" class="{} {}"></i>"#, surface_id, classes, html_escape(icon_name));
            }
        }
        ElementKind::Image => {
            attrs.push_str(&format!(r#" src="{}" alt="""#, html_escape(str_prop(props, "src").unwrap_or(""))));
        }
        ElementKind::ClipPath => {
            for (prop, css) in [("width", "width"), ("height", "height"), ("clip_path_string", "clip-path"), ("aspectRatio", "aspect-ratio")] {
                if let Some(v) = props.get(prop).filter(|v| !v.is_null()) {
                    inline_styles.push(format!("{}: {}", css, css_value(v)));
                }
            }
        }
        ElementKind::SizedBox => {
            for prop in ["width", "height"] {
                if let Some(v) = props.get(prop).filter(|v| !v.is_null()) {
                    inline_styles.push(format!("{}: {}", prop, css_length(v)));
                }
            }
        }
        ElementKind::Divider => {
            inline_styles.push("width: 100%".to_string());
            if let Some(h) = props.get("height").filter(|v| !v.is_null()) {
                inline_styles.push(format!("height: {}", css_length(h)));
            }
            if let Some(color) = str_prop(props, "color") {
                inline_styles.push(format!("background-color: {}", color));
            }
            if let Some(margin) = str_prop(props, "margin") {
                inline_styles.push(format!("margin: {}", margin));
            }
        }
        ElementKind::AspectRatio => {
            if let Some(ratio) = props.get("aspectRatio").filter(|v| !v.is_null()) {
                inline_styles.push(format!("aspect-ratio: {}", css_value(ratio)));
            }
        }
        ElementKind::Positioned => {
            for prop in ["top", "bottom", "left", "right", "width", "height"] {
                if let Some(v) = props.get(prop).filter(|v| !v.is_null()) {
                    inline_styles.push(format!("{}: {}", prop, css_length(v)));
                }
            }
        }
        _ => {}
    }

    // Generic style and layout overlays
    for source in ["style", LAYOUT_OVERRIDE_PROP] {
        if let Some(style_dict) = props.get(source).and_then(Value::as_object) {
            for (key, value) in style_dict {
                inline_styles.push(format!("{}: {}", key.replace('_', "-"), css_value(value)));
            }
        }
    }

    if let Some(pos) = str_prop(props, "position_type") {
        inline_styles.push(format!("position: {}", pos));
    }

    if !inline_styles.is_empty() {
        attrs.push_str(&format!(r#" style="{}""#, html_escape(&inline_styles.join("; "))));
    }

    if let Some(attr_dict) = props.get("attributes").and_then(Value::as_object) {
        for (key, value) in attr_dict {
            attrs.push_str(&format!(r#" {}="{}""#, html_escape(key), html_escape(&css_value(value))));
        }
    }

    // Event handlers
    if props.get("enabled").and_then(Value::as_bool).unwrap_or(true) {
        if let Some(cb_name) = str_prop(props, "onPressedName") {
            match props.get("onPressedArgs").and_then(Value::as_array).filter(|a| !a.is_empty()) {
                Some(args) => attrs.push_str(&format!(
                    r#" onclick="handleClickWithArgs('{}', '{}')""#,
                    html_escape(cb_name),
                    html_escape(&Value::Array(args.clone()).to_string())
                )),
                None => attrs.push_str(&format!(r#" onclick="handleClick('{}')""#, html_escape(cb_name))),
            }
        } else if let Some(cb_name) = str_prop(props, "onTapName") {
            attrs.push_str(&format!(r#" onclick="handleClick('{}')""#, html_escape(cb_name)));
        } else if let Some(cb_name) = str_prop(props, "onItemTapName") {
            let index = props.get("item_index").and_then(Value::as_i64).unwrap_or(-1);
            attrs.push_str(&format!(r#" onclick="handleItemTap('{}', {})""#, html_escape(cb_name), index));
        }
    }

    if let Some(tooltip) = str_prop(props, "tooltip") {
        attrs.push_str(&format!(r#" title="{}""#, html_escape(tooltip)));
    }

    if ["img", "hr", "br"].contains(&tag) {
        return format!(r#"<{tag} id="{id}" class="{classes}"{attrs}>"#, tag = tag, id = surface_id, classes = classes, attrs = attrs);
    }

    if inner_html.is_empty() {
        if let Some(raw) = str_prop(props, "inner_html") {
            inner_html = html_escape(raw);
        }
    }
    format!(
        r#"<{tag} id="{id}" class="{classes}"{attrs}>{inner}</{tag}>"#,
        tag = tag,
        id = surface_id,
        classes = classes,
        attrs = attrs,
        inner = inner_html
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn props(value: serde_json::Value) -> Props {
        value.as_object().unwrap().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    #[test]
    fn text_is_escaped() {
        let html = generate_html_stub(&ElementKind::Text, &"fw_id_1".into(), &props(json!({"data": "<b>&"})));
        assert_eq!(html, r#"<p id="fw_id_1" class="">&lt;b&gt;&amp;</p>"#);
    }

    #[test]
    fn button_gets_click_handler_and_tooltip() {
        let html = generate_html_stub(
            &ElementKind::TextButton,
            &"fw_id_2".into(),
            &props(json!({"css_class": "btn", "onPressedName": "cb_1", "tooltip": "Save"})),
        );
        assert_eq!(html, r#"<button id="fw_id_2" class="btn" onclick="handleClick('cb_1')" title="Save"></button>"#);
    }

    #[test]
    fn disabled_buttons_have_no_handler() {
        let html = generate_html_stub(
            &ElementKind::ElevatedButton,
            &"fw_id_3".into(),
            &props(json!({"onPressedName": "cb_1", "enabled": false})),
        );
        assert!(!html.contains("onclick"));
    }

    #[test]
    fn sized_box_and_layout_overlay_become_inline_styles() {
        let html = generate_html_stub(
            &ElementKind::SizedBox,
            &"fw_id_4".into(),
            &props(json!({"width": 10, "height": "50%", "layout_override": {"flex_grow": 1}})),
        );
        assert_eq!(html, r#"<div id="fw_id_4" class="" style="width: 10px; height: 50%; flex-grow: 1"></div>"#);
    }

    #[test]
    fn images_are_void_elements() {
        let html = generate_html_stub(&ElementKind::Image, &"fw_id_5".into(), &props(json!({"src": "a.png"})));
        assert_eq!(html, r#"<img id="fw_id_5" class="" src="a.png" alt="">"#);
    }

    #[test]
    fn unknown_kinds_render_as_div() {
        let kind = ElementKind::from_name("Sparkline");
        assert_eq!(tag_for(&kind, &Props::new()), "div");
    }
}
