use anyhow::Result;
use serde_json::Value;

/// A BEMJSON tree. Object keys keep their insertion order.
pub type BemJson = Value;

/// Turns a data tree into the final BEMJSON (the BEMTREE step).
pub trait TreeBuilder {
    fn transform(&self, tree: BemJson) -> Result<BemJson>;
}

/// Renders a BEMJSON tree to markup (the BH step).
pub trait Renderer {
    fn apply(&self, tree: &BemJson) -> Result<String>;
}

impl<F> TreeBuilder for F
where
    F: Fn(BemJson) -> Result<BemJson>,
{
    fn transform(&self, tree: BemJson) -> Result<BemJson> {
        self(tree)
    }
}

/// The pair of engines scoped to one bundle. The tree builder is optional.
pub struct Engines {
    pub tree_builder: Option<Box<dyn TreeBuilder>>,
    pub renderer: Box<dyn Renderer>,
}

impl Engines {
    pub fn new(renderer: impl Renderer + 'static) -> Self {
        Self {
            tree_builder: None,
            renderer: Box::new(renderer),
        }
    }

    pub fn with_tree_builder(mut self, builder: impl TreeBuilder + 'static) -> Self {
        self.tree_builder = Some(Box::new(builder));
        self
    }

    pub fn build_tree(&self, tree: BemJson) -> Result<BemJson> {
        match &self.tree_builder {
            Some(b) => b.transform(tree),
            None => Ok(tree),
        }
    }
}

impl std::fmt::Debug for Engines {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engines")
            .field("tree_builder", &self.tree_builder.is_some())
            .finish_non_exhaustive()
    }
}

/// CSS classes for a BEM node: `block`, `block__elem`, and one class per
/// modifier (`block_mod` for `true`, `block_mod_val` otherwise).
///
/// `block` falls back to `parent_block` for element nodes written without one.
pub fn bem_class(node: &BemJson, parent_block: Option<&str>) -> Option<String> {
    let obj = node.as_object()?;
    let block = obj
        .get("block")
        .and_then(Value::as_str)
        .or(parent_block)?;

    let base = match obj.get("elem").and_then(Value::as_str) {
        Some(elem) => format!("{block}__{elem}"),
        None => block.to_string(),
    };

    let mods_key = if obj.contains_key("elem") { "elemMods" } else { "mods" };
    let mut classes = vec![base.clone()];

    if let Some(mods) = obj.get(mods_key).and_then(Value::as_object) {
        for (name, val) in mods {
            match val {
                Value::Bool(true) => classes.push(format!("{base}_{name}")),
                Value::String(s) if !s.is_empty() => classes.push(format!("{base}_{name}_{s}")),
                Value::Number(n) => classes.push(format!("{base}_{name}_{n}")),
                _ => {}
            }
        }
    }

    if let Some(mix) = obj.get("mix") {
        let mixes: Vec<&Value> = match mix {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };
        for m in mixes {
            if let Some(c) = bem_class(m, Some(block)) {
                classes.push(c);
            }
        }
    }

    if let Some(extra) = obj.get("cls").and_then(Value::as_str) {
        if !extra.is_empty() {
            classes.push(extra.to_string());
        }
    }

    Some(classes.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Upper;

    impl Renderer for Upper {
        fn apply(&self, tree: &BemJson) -> Result<String> {
            Ok(tree["block"].as_str().unwrap_or_default().to_uppercase())
        }
    }

    #[test]
    fn build_tree_without_builder_is_identity() {
        let engines = Engines::new(Upper);
        let tree = json!({"block": "page", "content": ["ä"]});
        assert_eq!(engines.build_tree(tree.clone()).unwrap(), tree);
    }

    #[test]
    fn closure_tree_builder() {
        let engines = Engines::new(Upper).with_tree_builder(|mut t: BemJson| {
            t["block"] = json!("page");
            Ok::<_, anyhow::Error>(t)
        });
        let tree = engines.build_tree(json!({"block": "root"})).unwrap();
        assert_eq!(engines.renderer.apply(&tree).unwrap(), "PAGE");
    }

    #[test]
    fn classes_for_blocks_and_elements() {
        assert_eq!(bem_class(&json!({"block": "page"}), None).unwrap(), "page");
        assert_eq!(
            bem_class(
                &json!({"block": "button", "mods": {"theme": "islands", "disabled": true, "hidden": false}}),
                None
            )
            .unwrap(),
            "button button_theme_islands button_disabled"
        );
        assert_eq!(
            bem_class(&json!({"elem": "title", "elemMods": {"size": "l"}}), Some("header")).unwrap(),
            "header__title header__title_size_l"
        );
    }

    #[test]
    fn classes_include_mixes_and_cls() {
        let node = json!({
            "block": "menu",
            "mix": [{"block": "header", "elem": "menu"}, {"elem": "wide"}],
            "cls": "js-menu"
        });
        assert_eq!(
            bem_class(&node, None).unwrap(),
            "menu header__menu menu__wide js-menu"
        );
    }

    #[test]
    fn non_bem_nodes_have_no_class() {
        assert!(bem_class(&json!("text"), None).is_none());
        assert!(bem_class(&json!({"tag": "div"}), None).is_none());
    }
}
