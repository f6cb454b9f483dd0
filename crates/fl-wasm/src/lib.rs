//! WebAssembly bindings for the filtering log rule wizard
//!
//! Exposes pattern generation, rule composition and rule validation to the
//! extension's log page script.

use wasm_bindgen::prelude::*;

use fl_core::types::RequestType;
use fl_rules::{compose_rule, generate_patterns, RuleKind, RuleModifiers, RuleValidator, UrlRuleSyntax};

fn rule_kind(exception: bool) -> RuleKind {
    if exception {
        RuleKind::Exception
    } else {
        RuleKind::Block
    }
}

fn modifiers(scope_to_domain: bool, match_case: bool, third_party: bool) -> RuleModifiers {
    let mut modifiers = RuleModifiers::empty();
    modifiers.set(RuleModifiers::DOMAIN, scope_to_domain);
    modifiers.set(RuleModifiers::MATCH_CASE, match_case);
    modifiers.set(RuleModifiers::THIRD_PARTY, third_party);
    modifiers
}

/// Candidate patterns for a request, broadest first.
#[wasm_bindgen]
pub fn split_to_patterns(request_url: &str, exception: bool) -> js_sys::Array {
    generate_patterns(request_url, rule_kind(exception).pattern_prefix())
        .into_iter()
        .map(|pattern| JsValue::from_str(&pattern))
        .collect()
}

#[wasm_bindgen]
pub fn create_rule_from_params(
    pattern: &str,
    domain: &str,
    scope_to_domain: bool,
    match_case: bool,
    third_party: bool,
) -> String {
    compose_rule(pattern, domain, modifiers(scope_to_domain, match_case, third_party))
}

/// Initial state of the create-rule dialog for a request.
///
/// Returns `{ patterns, selected, scopeToDomain, matchCase, thirdParty, ruleText }`.
#[wasm_bindgen]
pub fn rule_draft(request_url: &str, frame_domain: &str, request_third_party: bool, exception: bool) -> JsValue {
    let patterns = generate_patterns(request_url, rule_kind(exception).pattern_prefix());
    let scope_to_domain = !frame_domain.is_empty();
    let rule_text = patterns
        .first()
        .map(|pattern| {
            compose_rule(
                pattern,
                frame_domain,
                modifiers(scope_to_domain, false, request_third_party),
            )
        })
        .unwrap_or_default();

    let patterns_array: js_sys::Array = patterns.iter().map(|p| JsValue::from_str(p)).collect();

    let result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&result, &"patterns".into(), &patterns_array);
    let _ = js_sys::Reflect::set(&result, &"selected".into(), &JsValue::from(0u32));
    let _ = js_sys::Reflect::set(&result, &"scopeToDomain".into(), &JsValue::from(scope_to_domain));
    let _ = js_sys::Reflect::set(&result, &"matchCase".into(), &JsValue::from(false));
    let _ = js_sys::Reflect::set(&result, &"thirdParty".into(), &JsValue::from(request_third_party));
    let _ = js_sys::Reflect::set(&result, &"ruleText".into(), &JsValue::from_str(&rule_text));
    result.into()
}

/// Check rule text before it is sent to the engine. Returns the text to
/// install.
#[wasm_bindgen]
pub fn validate_rule(rule_text: &str) -> Result<String, JsValue> {
    UrlRuleSyntax.validate(rule_text).map_err(|e| {
        let message = format!("Invalid rule {rule_text:?}: {e}");
        web_sys::console::warn_1(&JsValue::from_str(&message));
        JsValue::from_str(&message)
    })
}

/// Display label of a request type name such as `"SUBDOCUMENT"`.
#[wasm_bindgen]
pub fn request_type_label(request_type: &str) -> Result<String, JsValue> {
    RequestType::from_name(request_type)
        .map(|t| t.label().to_string())
        .ok_or_else(|| JsValue::from_str(&format!("Unknown request type: {request_type}")))
}
