//! Options shared by `select` and `create`.

use std::sync::LazyLock;

use regex::Regex;

use crate::container::ContainerStrategy;
use crate::host::TextMatch;

/// Default label of the widget's "create new option" menu item.
pub const DEFAULT_CREATE_OPTION_PATTERN: &str = r#"^Create ""#;

static DEFAULT_CREATE_OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_CREATE_OPTION_PATTERN).expect("default create pattern is valid"));

/// Select options
///
/// Every field is optional; the defaults fit a widget whose menu renders
/// inside its own wrapper.
#[derive(Debug, Clone)]
pub struct SelectConfig<N> {
    /// Element containing the menu, for widgets that portal it elsewhere.
    pub container: Option<N>,
    /// Overrides the create-affordance label matcher.
    pub create_option_text: Option<TextMatch>,
    /// Whether `create` waits for the typed text to show up as a value.
    pub wait_for_element: bool,
}

impl<N> Default for SelectConfig<N> {
    fn default() -> Self {
        SelectConfig { container: None, create_option_text: None, wait_for_element: true }
    }
}

impl<N: Clone> SelectConfig<N> {
    /// Create a new builder for SelectConfig
    pub fn builder() -> SelectConfigBuilder<N> {
        SelectConfigBuilder::default()
    }

    pub(crate) fn container_strategy(&self) -> ContainerStrategy<N> {
        ContainerStrategy::from(self.container.clone())
    }

    pub(crate) fn create_matcher(&self) -> TextMatch {
        self.create_option_text
            .clone()
            .unwrap_or_else(|| TextMatch::Pattern(DEFAULT_CREATE_OPTION.clone()))
    }
}

/// Builder for SelectConfig
#[derive(Debug, Clone)]
pub struct SelectConfigBuilder<N> {
    container: Option<N>,
    create_option_text: Option<TextMatch>,
    wait_for_element: Option<bool>,
}

impl<N> Default for SelectConfigBuilder<N> {
    fn default() -> Self {
        SelectConfigBuilder { container: None, create_option_text: None, wait_for_element: None }
    }
}

impl<N> SelectConfigBuilder<N> {
    pub fn container(mut self, container: N) -> Self {
        self.container = Some(container);
        self
    }

    pub fn create_option_text(mut self, matcher: impl Into<TextMatch>) -> Self {
        self.create_option_text = Some(matcher.into());
        self
    }

    pub fn wait_for_element(mut self, wait: bool) -> Self {
        self.wait_for_element = Some(wait);
        self
    }

    /// Build the SelectConfig
    pub fn build(self) -> SelectConfig<N> {
        SelectConfig {
            container: self.container,
            create_option_text: self.create_option_text,
            wait_for_element: self.wait_for_element.unwrap_or(true),
        }
    }
}
