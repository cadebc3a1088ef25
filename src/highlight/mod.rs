//! Hover-driven selector highlighting.
//!
//! Pointer moves over the style buffer hide the current highlight and re-arm
//! a single lookup timer. When the pointer rests for [`DEBOUNCE`], it reads
//! the parser state under the pointer and, on a selector, asks the
//! host to outline every node it matches.

mod css_state;

pub use css_state::TextStyleEditor;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::host::{CssInfo, CssState, HighlightOptions, NodeHighlighter, Point, StyleEditor};

/// Rest time before a pointer position is looked up.
pub const DEBOUNCE: Duration = Duration::from_millis(500);

pub struct SelectorHighlighter {
    editor: Arc<dyn StyleEditor>,
    highlighter: Option<Arc<dyn NodeHighlighter>>,
    stylesheets_actor: String,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SelectorHighlighter {
    /// Without a highlighter, pointer moves are ignored.
    pub fn new(
        editor: Arc<dyn StyleEditor>,
        highlighter: Option<Arc<dyn NodeHighlighter>>,
        stylesheets_actor: impl Into<String>,
    ) -> Self {
        if highlighter.is_none() {
            crate::log!(
                "highlight";
                "selector highlighter unavailable, hovered selectors will not be highlighted"
            );
        }
        Self {
            editor,
            highlighter,
            stylesheets_actor: stylesheets_actor.into(),
            delay: DEBOUNCE,
            pending: Mutex::new(None),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn is_available(&self) -> bool {
        self.highlighter.is_some()
    }

    /// Handle one pointer move. Must be called within a tokio runtime.
    pub fn pointer_moved(&self, point: Point) {
        let Some(highlighter) = self.highlighter.clone() else {
            return;
        };
        highlighter.hide();

        let editor = Arc::clone(&self.editor);
        let actor = self.stylesheets_actor.clone();
        let delay = self.delay;

        let mut pending = self.pending.lock();
        if let Some(task) = pending.take() {
            task.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            lookup(editor.as_ref(), highlighter.as_ref(), &actor, point).await;
        }));
    }

    /// Drop the pending lookup, if any.
    pub fn cancel(&self) {
        if let Some(task) = self.pending.lock().take() {
            task.abort();
        }
    }
}

impl Drop for SelectorHighlighter {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn lookup(
    editor: &dyn StyleEditor,
    highlighter: &dyn NodeHighlighter,
    stylesheets_actor: &str,
    point: Point,
) {
    let info = match editor
        .position_from_coords(point)
        .and_then(|position| editor.info_at(position))
    {
        Ok(info) => info,
        Err(e) => {
            crate::log!("highlight"; "{}", e);
            return;
        }
    };

    let Some(CssInfo {
        state: CssState::Selector,
        selector: Some(selector),
    }) = info
    else {
        return;
    };

    let node = match highlighter.owner_node(stylesheets_actor).await {
        Ok(node) => node,
        Err(e) => {
            crate::debug!("highlight"; "{}", e);
            return;
        }
    };
    crate::debug!("highlight"; "{}", selector);
    if let Err(e) = highlighter
        .show(&node, &HighlightOptions::border_only(selector))
        .await
    {
        crate::debug!("highlight"; "{}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Position, Region};
    use crate::testing::{FakeHighlighter, FakeStyleEditor};
    use tokio::time::sleep;

    fn selector(s: &str) -> Option<CssInfo> {
        Some(CssInfo {
            state: CssState::Selector,
            selector: Some(s.to_string()),
        })
    }

    fn setup(info: Option<CssInfo>) -> (SelectorHighlighter, Arc<FakeStyleEditor>, Arc<FakeHighlighter>) {
        let editor = Arc::new(FakeStyleEditor::answering(info));
        let highlighter = Arc::new(FakeHighlighter::default());
        let selector_highlighter = SelectorHighlighter::new(
            editor.clone(),
            Some(highlighter.clone() as Arc<dyn NodeHighlighter>),
            "stylesheets1",
        );
        (selector_highlighter, editor, highlighter)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_produces_single_lookup_after_last_move() {
        let (sh, editor, highlighter) = setup(selector("p.intro"));

        for x in 0..5 {
            sh.pointer_moved(Point { x: f64::from(x), y: 1.0 });
            sleep(Duration::from_millis(100)).await;
        }
        assert!(editor.queried.lock().is_empty());

        sleep(Duration::from_millis(450)).await;

        assert_eq!(*editor.queried.lock(), vec![Position { line: 1, ch: 4 }]);
        assert_eq!(highlighter.shown(), vec!["p.intro".to_string()]);
        assert_eq!(highlighter.hides(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_moves_each_lookup() {
        let (sh, editor, highlighter) = setup(selector("h1"));

        sh.pointer_moved(Point { x: 0.0, y: 0.0 });
        sleep(Duration::from_millis(600)).await;
        sh.pointer_moved(Point { x: 2.0, y: 0.0 });
        sleep(Duration::from_millis(600)).await;

        assert_eq!(editor.queried.lock().len(), 2);
        assert_eq!(highlighter.shown().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_highlight_options_outline_border() {
        let (sh, _editor, highlighter) = setup(selector(".card > a"));

        sh.pointer_moved(Point { x: 1.0, y: 1.0 });
        sleep(Duration::from_millis(600)).await;

        let options = highlighter.options.lock();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].selector, ".card > a");
        assert!(options[0].hide_info_bar);
        assert_eq!(options[0].show_only, Region::Border);
        assert_eq!(options[0].region, Region::Border);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_selector_state_does_nothing() {
        let (sh, editor, highlighter) = setup(Some(CssInfo {
            state: CssState::Property,
            selector: None,
        }));

        sh.pointer_moved(Point { x: 1.0, y: 1.0 });
        sleep(Duration::from_millis(600)).await;

        assert_eq!(editor.queried.lock().len(), 1);
        assert!(highlighter.shown().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_parse_error_is_swallowed() {
        let editor = Arc::new(FakeStyleEditor::failing("unterminated comment"));
        let highlighter = Arc::new(FakeHighlighter::default());
        let sh = SelectorHighlighter::new(
            editor,
            Some(highlighter.clone() as Arc<dyn NodeHighlighter>),
            "stylesheets1",
        );

        sh.pointer_moved(Point { x: 1.0, y: 1.0 });
        sleep(Duration::from_millis(600)).await;

        assert!(highlighter.shown().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_owner_lookup_failure_shows_nothing() {
        let editor = Arc::new(FakeStyleEditor::answering(selector("p")));
        let highlighter = Arc::new(FakeHighlighter {
            fail_owner: true,
            ..FakeHighlighter::default()
        });
        let sh = SelectorHighlighter::new(
            editor,
            Some(highlighter.clone() as Arc<dyn NodeHighlighter>),
            "stylesheets1",
        );

        sh.pointer_moved(Point { x: 0.0, y: 0.0 });
        sleep(Duration::from_millis(600)).await;

        assert!(highlighter.shown().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_highlighter_ignores_moves() {
        let editor = Arc::new(FakeStyleEditor::answering(selector("p")));
        let sh = SelectorHighlighter::new(editor.clone(), None, "stylesheets1");
        assert!(!sh.is_available());

        sh.pointer_moved(Point { x: 0.0, y: 0.0 });
        sleep(Duration::from_millis(600)).await;

        assert!(editor.queried.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_lookup() {
        let (sh, editor, _highlighter) = setup(selector("p"));

        sh.pointer_moved(Point { x: 0.0, y: 0.0 });
        sh.cancel();
        sleep(Duration::from_millis(600)).await;

        assert!(editor.queried.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_against_text_editor() {
        let editor = Arc::new(TextStyleEditor::new("ul li {\n  color: red;\n}"));
        let highlighter = Arc::new(FakeHighlighter::default());
        let sh = SelectorHighlighter::new(
            editor.clone(),
            Some(highlighter.clone() as Arc<dyn NodeHighlighter>),
            "stylesheets1",
        );

        sh.pointer_moved(Point { x: 1.0, y: 0.0 });
        sleep(Duration::from_millis(600)).await;
        sh.pointer_moved(Point { x: 4.0, y: 1.0 });
        sleep(Duration::from_millis(600)).await;

        assert_eq!(highlighter.shown(), vec!["ul li".to_string()]);
    }
}
