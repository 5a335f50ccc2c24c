//! Rule selection on parsed stylesheets (lightningcss).
//!
//! Selectors are matched by presence: a selector applies when each of its
//! type, class and id components occurs somewhere in the page.
//! Pseudo-classes, pseudo-elements, attribute selectors and negations are
//! ignored. `:is()`/`:where()` match when any of their arguments does.

use anyhow::{Result, anyhow};
use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::selector::{Component, Selector};
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

use super::page::UsedSelectors;

/// The rules of `css` that apply to the page, printed minified.
///
/// Conditional groups (`@media`, `@supports`, `@layer`, `@container`,
/// `@scope`, `@starting-style`) keep their matching children and are
/// dropped when none is left. `@font-face` survives only when some style
/// rule was kept. Everything else (`@import`, `@keyframes`, ...) is left
/// to the deferred sheet.
pub fn extract_critical(css: &str, used: &UsedSelectors) -> Result<String> {
    let mut sheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| anyhow!("invalid stylesheet: {e}"))?;
    sheet.license_comments.clear();

    let mut kept_style = false;
    let rules = std::mem::take(&mut sheet.rules.0);
    sheet.rules.0 = retain_rules(rules, used, &mut kept_style);
    if !kept_style {
        return Ok(String::new());
    }

    let printed = sheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| anyhow!("failed to print stylesheet: {e}"))?;
    Ok(printed.code)
}

fn retain_rules<'i>(
    rules: Vec<CssRule<'i>>,
    used: &UsedSelectors,
    kept_style: &mut bool,
) -> Vec<CssRule<'i>> {
    rules
        .into_iter()
        .filter_map(|rule| retain_rule(rule, used, kept_style))
        .collect()
}

fn retain_rule<'i>(
    rule: CssRule<'i>,
    used: &UsedSelectors,
    kept_style: &mut bool,
) -> Option<CssRule<'i>> {
    match rule {
        CssRule::Style(mut style) => {
            style.selectors.0.retain(|s| selector_matches(s, used));
            if style.selectors.0.is_empty() {
                return None;
            }
            retain_group(&mut style.rules, used, kept_style);
            if style.declarations.is_empty() && style.rules.0.is_empty() {
                return None;
            }
            *kept_style = true;
            Some(CssRule::Style(style))
        }
        CssRule::Nesting(mut nesting) => {
            let style = retain_rule(CssRule::Style(nesting.style), used, kept_style)?;
            let CssRule::Style(style) = style else {
                return None;
            };
            nesting.style = style;
            Some(CssRule::Nesting(nesting))
        }
        CssRule::Media(mut media) => {
            retain_group(&mut media.rules, used, kept_style).then_some(CssRule::Media(media))
        }
        CssRule::Supports(mut supports) => retain_group(&mut supports.rules, used, kept_style)
            .then_some(CssRule::Supports(supports)),
        CssRule::LayerBlock(mut layer) => {
            retain_group(&mut layer.rules, used, kept_style).then_some(CssRule::LayerBlock(layer))
        }
        CssRule::Container(mut container) => retain_group(&mut container.rules, used, kept_style)
            .then_some(CssRule::Container(container)),
        CssRule::StartingStyle(mut starting) => retain_group(&mut starting.rules, used, kept_style)
            .then_some(CssRule::StartingStyle(starting)),
        CssRule::Scope(mut scope) => {
            let in_scope = scope
                .scope_start
                .as_ref()
                .is_none_or(|start| start.0.iter().any(|s| selector_matches(s, used)));
            (in_scope && retain_group(&mut scope.rules, used, kept_style))
                .then_some(CssRule::Scope(scope))
        }
        font @ CssRule::FontFace(_) => Some(font),
        // Bare declarations inside a kept style rule
        decls @ CssRule::NestedDeclarations(_) => Some(decls),
        _ => None,
    }
}

/// Filter a group's children in place; whether any is left.
fn retain_group(rules: &mut CssRuleList<'_>, used: &UsedSelectors, kept_style: &mut bool) -> bool {
    rules.0 = retain_rules(std::mem::take(&mut rules.0), used, kept_style);
    !rules.0.is_empty()
}

/// Whether every type, class and id component finds a match on the page.
fn selector_matches(selector: &Selector<'_>, used: &UsedSelectors) -> bool {
    selector
        .iter_raw_match_order()
        .all(|component| component_matches(component, used))
}

fn component_matches(component: &Component<'_>, used: &UsedSelectors) -> bool {
    match component {
        Component::LocalName(name) => used.has_tag(&name.lower_name.0),
        Component::Class(class) => used.has_class(&class.0),
        Component::ID(id) => used.has_id(&id.0),
        Component::Is(list) | Component::Where(list) | Component::Any(_, list) => {
            list.iter().any(|s| selector_matches(s, used))
        }
        _ => true,
    }
}
