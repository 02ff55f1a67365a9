//! Rule Matcher
//!
//! Pure filter evaluation: every configured filter must hold
//! (AND-conjunction); an unset filter always matches. String comparisons
//! are case-sensitive.

use shared::models::{Product, Rule};

/// Check if a rule's filters match a product.
pub fn rule_matches_product(rule: &Rule, product: &Product) -> bool {
    // Product-type filter
    if let Some(filter) = non_empty(rule.product_type_filter.as_deref()) {
        if product.product_type.as_deref() != Some(filter) {
            return false;
        }
    }

    // Vendor filter
    if let Some(filter) = non_empty(rule.vendor_filter.as_deref()) {
        if product.vendor.as_deref() != Some(filter) {
            return false;
        }
    }

    // Tag and collection filters are reserved for future extension.

    true
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{ActionKind, Product, Rule};

    fn product(product_type: Option<&str>, vendor: Option<&str>) -> Product {
        Product {
            id: 1,
            store_id: 1,
            remote_id: 100,
            title: "Widget".into(),
            handle: "widget".into(),
            product_type: product_type.map(Into::into),
            vendor: vendor.map(Into::into),
            status: "active".into(),
            published_at: None,
            is_visible: true,
            hidden_at: None,
            scheduled_return: None,
            last_synced: 0,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn rule(product_type_filter: Option<&str>, vendor_filter: Option<&str>) -> Rule {
        Rule {
            id: 1,
            store_id: 1,
            name: "test".into(),
            description: None,
            trigger_type: "out_of_stock".into(),
            threshold: 0,
            action_type: ActionKind::HideProduct.as_str().into(),
            delay_minutes: 0,
            auto_restore: false,
            restore_after_days: 0,
            product_type_filter: product_type_filter.map(Into::into),
            vendor_filter: vendor_filter.map(Into::into),
            send_notification: false,
            is_active: true,
            priority: 0,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn unset_filters_match_everything() {
        assert!(rule_matches_product(&rule(None, None), &product(None, None)));
        assert!(rule_matches_product(
            &rule(None, None),
            &product(Some("Shoes"), Some("Acme"))
        ));
    }

    #[test]
    fn empty_string_filter_is_treated_as_unset() {
        assert!(rule_matches_product(
            &rule(Some(""), Some("")),
            &product(None, None)
        ));
    }

    #[test]
    fn product_type_filter_requires_exact_match() {
        let r = rule(Some("Shoes"), None);
        assert!(rule_matches_product(&r, &product(Some("Shoes"), None)));
        assert!(!rule_matches_product(&r, &product(Some("shoes"), None)));
        assert!(!rule_matches_product(&r, &product(Some("Hats"), None)));
        assert!(!rule_matches_product(&r, &product(None, None)));
    }

    #[test]
    fn filters_are_a_conjunction() {
        let r = rule(Some("Shoes"), Some("Acme"));
        assert!(rule_matches_product(&r, &product(Some("Shoes"), Some("Acme"))));
        assert!(!rule_matches_product(&r, &product(Some("Shoes"), Some("Other"))));
        assert!(!rule_matches_product(&r, &product(Some("Hats"), Some("Acme"))));
    }
}
