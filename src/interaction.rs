//! The interaction protocol: opening the menu, picking options, creating
//! new ones and clearing values.
//!
//! Every operation takes the widget's text input and replays the event
//! sequence a user would produce. Waiting is delegated to the [`Host`]; an
//! error from any step aborts the rest of the operation.

use regex::Regex;

use crate::config::SelectConfig;
use crate::container::container_from_input;
use crate::error::{Affordance, Result, SelectError};
use crate::event::{self, ARROW_DOWN};
use crate::host::{Host, TextMatch, TextQuery};

/// Hidden-from-assistive-technology icons: value remove buttons, the
/// clear-all indicator and the dropdown arrow, in that document order.
pub const ICON_SELECTOR: &str = r#"svg[aria-hidden="true"]"#;

/// One label or an ordered sequence of labels to select.
#[derive(Debug, Clone)]
pub struct Labels(Vec<TextMatch>);

impl Labels {
    pub fn iter(&self) -> impl Iterator<Item = &TextMatch> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<TextMatch> for Labels {
    fn from(label: TextMatch) -> Self {
        Labels(vec![label])
    }
}

impl From<&str> for Labels {
    fn from(label: &str) -> Self {
        Labels(vec![label.into()])
    }
}

impl From<String> for Labels {
    fn from(label: String) -> Self {
        Labels(vec![label.into()])
    }
}

impl From<Regex> for Labels {
    fn from(label: Regex) -> Self {
        Labels(vec![label.into()])
    }
}

impl<T: Into<TextMatch>> From<Vec<T>> for Labels {
    fn from(labels: Vec<T>) -> Self {
        Labels(labels.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<TextMatch>, const N: usize> From<[T; N]> for Labels {
    fn from(labels: [T; N]) -> Self {
        Labels(labels.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<TextMatch> + Clone> From<&[T]> for Labels {
    fn from(labels: &[T]) -> Self {
        Labels(labels.iter().cloned().map(Into::into).collect())
    }
}

/// Focus the input, then press ArrowDown.
///
/// Focus alone leaves the menu closed; the key press while focused opens
/// it. Nothing is awaited, so callers follow up with a waiting step.
/// Safe to repeat on an already open menu.
pub fn open_menu<H: Host + ?Sized>(host: &H, input: &H::Node) -> Result<()> {
    event::focus(host, input)?;
    event::key_down(host, input, ARROW_DOWN)
}

/// Type `text` into the input with a single change event.
pub fn type_text<H: Host + ?Sized>(host: &H, input: &H::Node, text: &str) -> Result<()> {
    event::change(host, input, text)
}

/// Select every label in order.
///
/// Choosing an option may close the menu and reset its highlighted entry,
/// so the menu is reopened before each label. Options already clicked stay
/// clicked when a later label fails.
pub async fn select<H: Host + ?Sized>(
    host: &H,
    input: &H::Node,
    labels: impl Into<Labels>,
    config: &SelectConfig<H::Node>,
) -> Result<()> {
    let labels = labels.into();
    let container = config.container_strategy().resolve(host, input)?;

    for label in labels.iter() {
        open_menu(host, input)?;
        let query = TextQuery::accessible(label.clone());
        tracing::debug!(label = %label, "waiting for option");
        let option = host.find_by_text(&container, &query).await.map_err(|e| {
            tracing::warn!(label = %label, error = %e, "option lookup failed");
            e
        })?;
        event::click(host, &option)?;
    }
    Ok(())
}

/// Type `text` and pick the widget's "create" menu item.
///
/// Unless `config.wait_for_element` is off, resolves only once `text` is
/// visible in the container as a committed value.
pub async fn create<H: Host + ?Sized>(
    host: &H,
    input: &H::Node,
    text: &str,
    config: &SelectConfig<H::Node>,
) -> Result<()> {
    open_menu(host, input)?;
    type_text(host, input, text)?;
    select(host, input, config.create_matcher(), config).await?;

    if config.wait_for_element {
        let container = config.container_strategy().resolve(host, input)?;
        tracing::debug!(text, "waiting for created value");
        host.find_by_text(&container, &TextQuery::new(text)).await?;
    }
    Ok(())
}

/// The first hidden icon removes the first value. The last icon is always
/// the dropdown arrow, so a lone icon means there is nothing to clear.
pub fn clear_first_affordance<N: Clone>(icons: &[N]) -> Option<N> {
    if icons.len() < 2 {
        return None;
    }
    icons.first().cloned()
}

/// The second-to-last hidden icon clears every value; the last one is the
/// dropdown arrow and must never be pressed here.
pub fn clear_all_affordance<N: Clone>(icons: &[N]) -> Option<N> {
    icons.len().checked_sub(2).and_then(|i| icons.get(i)).cloned()
}

/// Remove the first selected value, then blur the input.
pub async fn clear_first<H: Host + ?Sized>(host: &H, input: &H::Node) -> Result<()> {
    clear_with(host, input, Affordance::ClearFirst, clear_first_affordance).await
}

/// Remove every selected value, then blur the input.
pub async fn clear_all<H: Host + ?Sized>(host: &H, input: &H::Node) -> Result<()> {
    clear_with(host, input, Affordance::ClearAll, clear_all_affordance).await
}

async fn clear_with<H, F>(host: &H, input: &H::Node, affordance: Affordance, pick: F) -> Result<()>
where
    H: Host + ?Sized,
    F: Fn(&[H::Node]) -> Option<H::Node>,
{
    let container = container_from_input(host, input)?;
    let icons = host.query_all(&container, ICON_SELECTOR)?;
    let button = pick(&icons).ok_or(SelectError::MissingAffordance { affordance, icons: icons.len() })?;
    tracing::debug!(%affordance, icons = icons.len(), "pressing clear icon");

    // The click alone would open the menu; the widget only suppresses that
    // after seeing the mouse-down.
    event::mouse_down(host, &button)?;
    event::click(host, &button)?;
    // The widget refocuses the input asynchronously after clearing.
    host.settle().await;
    event::blur(host, input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SyntheticEvent;
    use crate::mock::{MockDocument, MockSelect};
    use futures::executor::block_on;

    fn fruits() -> MockSelect {
        MockSelect::new(["Apple", "Banana", "Cherry"])
    }

    #[test]
    fn test_open_menu_twice_keeps_menu_open() {
        let doc = MockDocument::new(fruits());
        let input = doc.input();
        open_menu(&doc, &input).unwrap();
        doc.flush();
        assert!(doc.is_menu_open());
        open_menu(&doc, &input).unwrap();
        doc.flush();
        assert!(doc.is_menu_open());
    }

    #[test]
    fn test_open_menu_fires_focus_then_arrow_down() {
        let doc = MockDocument::new(fruits());
        let input = doc.input();
        open_menu(&doc, &input).unwrap();
        assert_eq!(
            doc.dispatched(),
            vec![(input, SyntheticEvent::Focus), (input, SyntheticEvent::KeyDown(ARROW_DOWN))]
        );
    }

    #[test]
    fn test_select_single_option() {
        let doc = MockDocument::new(fruits());
        let input = doc.input();
        block_on(select(&doc, &input, "Banana", &SelectConfig::default())).unwrap();
        doc.flush();
        assert_eq!(doc.values(), vec!["Banana".to_string()]);
        assert!(!doc.is_menu_open());
    }

    #[test]
    fn test_select_many_reopens_before_each_label() {
        let doc = MockDocument::new(fruits().multi(true));
        let input = doc.input();
        block_on(select(&doc, &input, ["Apple", "Cherry"], &SelectConfig::default())).unwrap();
        doc.flush();
        assert_eq!(doc.values(), vec!["Apple".to_string(), "Cherry".to_string()]);
        assert_eq!(doc.queries(), vec!["Apple".to_string(), "Cherry".to_string()]);

        let kinds: Vec<&str> = doc.dispatched().iter().map(|(_, e)| e.kind()).collect();
        assert_eq!(kinds, vec!["focus", "keydown", "click", "focus", "keydown", "click"]);
    }

    #[test]
    fn test_select_waits_for_slow_menu() {
        let doc = MockDocument::new(fruits().render_delay(3));
        let input = doc.input();
        block_on(select(&doc, &input, "Cherry", &SelectConfig::default())).unwrap();
        doc.flush();
        assert_eq!(doc.values(), vec!["Cherry".to_string()]);
    }

    #[test]
    fn test_select_clicks_accessible_copy_not_live_region() {
        let doc = MockDocument::new(fruits());
        let input = doc.input();
        // Opening highlights Apple, which the live region announces verbatim.
        open_menu(&doc, &input).unwrap();
        doc.flush();
        assert_eq!(doc.live_region_text().as_deref(), Some("Apple"));
        assert_eq!(doc.elements_with_text("Apple").len(), 2);

        block_on(select(&doc, &input, "Apple", &SelectConfig::default())).unwrap();
        let clicked: Vec<_> = doc
            .dispatched()
            .into_iter()
            .filter(|(_, e)| *e == SyntheticEvent::Click)
            .map(|(node, _)| node)
            .collect();
        assert_eq!(clicked.len(), 1);
        assert_eq!(doc.attribute(clicked[0], "tabindex").as_deref(), Some("-1"));
        assert!(doc.attribute(clicked[0], "aria-live").is_none());
        doc.flush();
        assert_eq!(doc.values(), vec!["Apple".to_string()]);
    }

    #[test]
    fn test_select_pattern_label() {
        let doc = MockDocument::new(fruits());
        let input = doc.input();
        let label = Regex::new("^Ch").unwrap();
        block_on(select(&doc, &input, label, &SelectConfig::default())).unwrap();
        doc.flush();
        assert_eq!(doc.values(), vec!["Cherry".to_string()]);
    }

    #[test]
    fn test_select_missing_option_is_not_found() {
        let doc = MockDocument::new(fruits());
        let input = doc.input();
        let result = block_on(select(&doc, &input, "DoesNotExist", &SelectConfig::default()));
        match result {
            Err(SelectError::NotFound { label, .. }) => assert_eq!(label, "DoesNotExist"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
        assert!(doc.dispatched().iter().all(|(_, e)| *e != SyntheticEvent::Click));
        doc.flush();
        assert!(doc.values().is_empty());
    }

    #[test]
    fn test_select_stops_at_first_missing_label() {
        let doc = MockDocument::new(fruits().multi(true));
        let input = doc.input();
        let result = block_on(select(&doc, &input, ["Apple", "Durian", "Cherry"], &SelectConfig::default()));
        assert!(matches!(result, Err(SelectError::NotFound { .. })));
        doc.flush();
        assert_eq!(doc.values(), vec!["Apple".to_string()]);
        assert_eq!(doc.queries(), vec!["Apple".to_string(), "Durian".to_string()]);
    }

    #[test]
    fn test_select_portal_menu_needs_explicit_container() {
        let doc = MockDocument::new(fruits().portal(true));
        let input = doc.input();

        let result = block_on(select(&doc, &input, "Apple", &SelectConfig::default()));
        assert!(matches!(result, Err(SelectError::NotFound { .. })));

        let config = SelectConfig::builder().container(doc.body()).build();
        block_on(select(&doc, &input, "Apple", &config)).unwrap();
        doc.flush();
        assert_eq!(doc.values(), vec!["Apple".to_string()]);
    }

    #[test]
    fn test_select_shallow_tree_is_structure_mismatch() {
        let doc = MockDocument::new(fruits());
        let orphan = doc.orphan_input();
        let result = block_on(select(&doc, &orphan, "Apple", &SelectConfig::default()));
        assert_eq!(result, Err(SelectError::StructureMismatch { expected: 4, reached: 1 }));
        assert!(doc.dispatched().is_empty());
    }

    #[test]
    fn test_create_commits_typed_value() {
        let doc = MockDocument::new(fruits().creatable(true));
        let input = doc.input();
        block_on(create(&doc, &input, "NewTag", &SelectConfig::default())).unwrap();
        doc.flush();
        assert_eq!(doc.values(), vec!["NewTag".to_string()]);
        assert_eq!(doc.queries(), vec!["/^Create \"/".to_string(), "NewTag".to_string()]);
        assert!(doc
            .dispatched()
            .contains(&(input, SyntheticEvent::Change { value: "NewTag".to_string() })));
    }

    #[test]
    fn test_create_with_custom_affordance_text() {
        let doc = MockDocument::new(fruits().creatable(true).create_label("Add"));
        let input = doc.input();

        let result = block_on(create(&doc, &input, "NewTag", &SelectConfig::default()));
        assert!(matches!(result, Err(SelectError::NotFound { .. })));

        let doc = MockDocument::new(fruits().creatable(true).create_label("Add"));
        let input = doc.input();
        let config = SelectConfig::builder().create_option_text(Regex::new("^Add ").unwrap()).build();
        block_on(create(&doc, &input, "NewTag", &config)).unwrap();
        doc.flush();
        assert_eq!(doc.values(), vec!["NewTag".to_string()]);
    }

    #[test]
    fn test_create_without_confirmation_wait() {
        let doc = MockDocument::new(fruits().creatable(true));
        let input = doc.input();
        let config = SelectConfig::builder().wait_for_element(false).build();
        block_on(create(&doc, &input, "NewTag", &config)).unwrap();
        assert_eq!(doc.queries(), vec!["/^Create \"/".to_string()]);
    }

    #[test]
    fn test_create_on_plain_widget_is_not_found() {
        let doc = MockDocument::new(fruits());
        let input = doc.input();
        let result = block_on(create(&doc, &input, "NewTag", &SelectConfig::default()));
        match result {
            Err(SelectError::NotFound { label, .. }) => assert_eq!(label, "/^Create \"/"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_clear_all_affordance_is_second_to_last() {
        assert_eq!(clear_all_affordance(&["clear-all", "arrow"]), Some("clear-all"));
        assert_eq!(clear_all_affordance(&["a", "b", "clear-all", "arrow"]), Some("clear-all"));
        assert_eq!(clear_all_affordance(&["arrow"]), None);
        assert_eq!(clear_all_affordance::<&str>(&[]), None);
    }

    #[test]
    fn test_clear_first_affordance_never_picks_lone_arrow() {
        assert_eq!(clear_first_affordance(&["remove", "clear-all", "arrow"]), Some("remove"));
        assert_eq!(clear_first_affordance(&["arrow"]), None);
        assert_eq!(clear_first_affordance::<&str>(&[]), None);
    }

    #[test]
    fn test_clear_all_presses_clear_indicator_only() {
        let doc = MockDocument::new(fruits().multi(true).selected(["Apple", "Banana", "Cherry"]));
        let input = doc.input();
        doc.flush();
        let icons = doc.query_all(&doc.container(), ICON_SELECTOR).unwrap();
        assert_eq!(icons.len(), 5);
        let arrow = icons[4];

        block_on(clear_all(&doc, &input)).unwrap();
        let targets: Vec<_> = doc.dispatched().into_iter().map(|(node, e)| (node, e.kind())).collect();
        assert_eq!(
            targets,
            vec![(icons[3], "mousedown"), (icons[3], "click"), (input, "blur")]
        );
        assert!(targets.iter().all(|(node, _)| *node != arrow));
        doc.flush();
        assert!(doc.values().is_empty());
    }

    #[test]
    fn test_clear_first_removes_first_value() {
        let doc = MockDocument::new(fruits().multi(true).selected(["Apple", "Banana"]));
        let input = doc.input();
        doc.flush();
        block_on(clear_first(&doc, &input)).unwrap();
        doc.flush();
        assert_eq!(doc.values(), vec!["Banana".to_string()]);
    }

    #[test]
    fn test_clear_first_on_single_value() {
        let doc = MockDocument::new(fruits().selected(["Cherry"]));
        let input = doc.input();
        doc.flush();
        block_on(clear_first(&doc, &input)).unwrap();
        doc.flush();
        assert!(doc.values().is_empty());
    }

    #[test]
    fn test_clear_leaves_input_blurred_after_refocus() {
        let doc = MockDocument::new(fruits().selected(["Cherry"]));
        let input = doc.input();
        doc.flush();
        block_on(clear_all(&doc, &input)).unwrap();
        doc.flush();
        assert!(!doc.is_focused());
        assert!(!doc.is_menu_open());
    }

    #[test]
    fn test_clear_without_values_is_missing_affordance() {
        let doc = MockDocument::new(fruits());
        let input = doc.input();
        doc.flush();
        assert_eq!(
            block_on(clear_all(&doc, &input)),
            Err(SelectError::MissingAffordance { affordance: Affordance::ClearAll, icons: 1 })
        );
        assert_eq!(
            block_on(clear_first(&doc, &input)),
            Err(SelectError::MissingAffordance { affordance: Affordance::ClearFirst, icons: 1 })
        );
        assert!(doc.dispatched().is_empty());
    }

    #[test]
    fn test_clear_on_non_clearable_value_never_presses_arrow() {
        // Only the dropdown arrow is rendered even though a value is selected.
        let doc = MockDocument::new(fruits().clearable(false).selected(["Banana"]));
        let input = doc.input();
        doc.flush();
        assert_eq!(
            block_on(clear_all(&doc, &input)),
            Err(SelectError::MissingAffordance { affordance: Affordance::ClearAll, icons: 1 })
        );
        assert_eq!(
            block_on(clear_first(&doc, &input)),
            Err(SelectError::MissingAffordance { affordance: Affordance::ClearFirst, icons: 1 })
        );
        assert!(doc.dispatched().is_empty());
        assert_eq!(doc.values(), vec!["Banana".to_string()]);
    }

    #[test]
    fn test_labels_from_single_and_many() {
        let one = Labels::from("Apple");
        assert_eq!(one.len(), 1);
        assert!(!one.is_empty());

        let many = Labels::from(vec!["Apple", "Banana"]);
        assert_eq!(many.len(), 2);
        let rendered: Vec<String> = many.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["Apple".to_string(), "Banana".to_string()]);

        assert!(Labels::from(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn test_select_with_no_labels_dispatches_nothing() {
        let doc = MockDocument::new(fruits());
        let input = doc.input();
        block_on(select(&doc, &input, Vec::<String>::new(), &SelectConfig::default())).unwrap();
        assert!(doc.dispatched().is_empty());
    }

    #[test]
    fn test_detached_option_error_propagates_verbatim() {
        let doc = MockDocument::new(fruits());
        let input = doc.input();
        doc.detach(input);
        let result = open_menu(&doc, &input);
        assert_eq!(
            result,
            Err(SelectError::Environment { message: format!("cannot dispatch focus on detached node {:?}", input) })
        );
    }
}
