//! HTML input descriptors for an institution's login form.

use quick_xml::escape::escape;
use serde::Serialize;

use crate::models::LoginField;

/// One rendered input. Masked login fields render twice: the password input
/// and a "Confirm" duplicate the front end drops before submitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginFormInput {
    pub label: String,
    pub id: String,
    pub name: String,
    pub display_order: u32,
    pub mask: bool,
    pub html_input: String,
}

/// Render fields in display order. `css` is applied as the class attribute
/// of every input.
pub fn render(fields: &[LoginField], css: Option<&str>) -> Vec<LoginFormInput> {
    let class = escape(css.unwrap_or(""));
    let mut inputs = Vec::with_capacity(fields.len());

    for field in fields {
        let label = field.description.clone().unwrap_or_else(|| field.name.clone());
        let data = format!(
            r#"class="{}" data-input-id="{}" data-input-name="{}""#,
            class,
            escape(&field.id),
            escape(&field.name)
        );

        let base = LoginFormInput {
            label: label.clone(),
            id: field.id.clone(),
            name: field.name.clone(),
            display_order: field.display_order,
            mask: field.mask,
            html_input: String::new(),
        };

        if field.mask {
            inputs.push(LoginFormInput {
                html_input: format!(r#"<input type="password" id="fi-pass" {}>"#, data),
                ..base.clone()
            });
            inputs.push(LoginFormInput {
                label: format!("Confirm {}", label),
                display_order: field.display_order.saturating_add(1),
                html_input: format!(
                    r#"<input type="password" id="fi-pass-dup" {} data-nullify="1">"#,
                    data
                ),
                ..base
            });
        } else {
            inputs.push(LoginFormInput {
                html_input: format!(r#"<input type="text" {}>"#, data),
                ..base
            });
        }
    }

    inputs.sort_by_key(|input| input.display_order);
    inputs
}
