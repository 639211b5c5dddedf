//! # Editing surface controller
//!
//! One field: an engine, the host it reports to, and the session state in
//! between.
//!
//! ## Data flow
//!
//! ```text
//! engine notification ──► handle() ──► session / model ──► FieldHost
//!                                                              │
//! set_props(value) ◄───────────────────────────────────────────┘
//!        │
//!        └─ differs from previous prop and from the last emit?
//!               └─ yes: write into the engine under a bookmark,
//!                       with undo tracking off
//! ```
//!
//! Dispatch never fails: engine errors are logged and the operation that
//! hit them is dropped.

use crate::announce::{result_count_message, Announcer};
use crate::boundary::ZeroWidthBoundaryHandler;
use crate::config::{EngineSettings, SurfaceConfig};
use crate::converter::FormatConverter;
use crate::engine::{EditableEngine, EngineCommand, FieldShortcut, FormatDefinition, Shortcut, ShortcutAction};
use crate::errors::{EngineError, SurfaceError};
use crate::formats::{FormatChange, FormatState, LinkChange};
use crate::normalizer::{BasicNormalizer, Block, ContentNormalizer, NormalizeRequest, Normalized, PasteMode};
use crate::notification::{ChangeOrigin, EventResponse, Key, KeyEvent, Notification};
use crate::paste::{BlobRegistry, BlockRoute, PasteClassifier, PasteOutcome, PastePayload};
use crate::props::{FieldHost, FieldProps};
use crate::scheduler::{DeferredQueue, DeferredTask};
use crate::session::FieldSessionState;
use crate::split_merge::{EnterAction, SplitMergeController, SplitParts};
use crate::tracker::{FocusPosition, SelectionAndFormatTracker};
use crate::undo::CheckpointDecision;
use crate::value::{Value, ValueFormat};
use richtext_dom::entities::escape_text;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

pub struct EditingSurfaceController<E, H, N = BasicNormalizer> {
    engine: E,
    host: H,
    normalizer: N,
    props: FieldProps,
    converter: FormatConverter,
    boundary: ZeroWidthBoundaryHandler,
    tracker: SelectionAndFormatTracker,
    split_merge: SplitMergeController,
    paste: PasteClassifier,
    blobs: BlobRegistry,
    session: FieldSessionState,
    deferred: DeferredQueue,
    announcer: Announcer,
    mounted: bool,
}

impl<E: EditableEngine, H: FieldHost> EditingSurfaceController<E, H, BasicNormalizer> {
    pub fn new(engine: E, host: H, props: FieldProps) -> Self {
        Self::with_normalizer(engine, host, BasicNormalizer::new(), props, SurfaceConfig::default())
    }
}

impl<E: EditableEngine, H: FieldHost, N: ContentNormalizer> EditingSurfaceController<E, H, N> {
    pub fn with_normalizer(engine: E, host: H, normalizer: N, props: FieldProps, config: SurfaceConfig) -> Self {
        let converter = FormatConverter::new(&config);
        let boundary = ZeroWidthBoundaryHandler::new(config.sentinel);

        Self {
            engine,
            host,
            normalizer,
            session: FieldSessionState::new(props.value.clone(), true),
            props,
            split_merge: SplitMergeController::new(converter.clone(), boundary),
            converter,
            boundary,
            tracker: SelectionAndFormatTracker::new(&config),
            paste: PasteClassifier::new(),
            blobs: BlobRegistry::new(),
            deferred: DeferredQueue::new(),
            announcer: Announcer::from_millis(config.announce_debounce_ms),
            mounted: false,
        }
    }

    // ---- accessors ------------------------------------------------------

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn props(&self) -> &FieldProps {
        &self.props
    }

    pub fn session(&self) -> &FieldSessionState {
        &self.session
    }

    pub fn formats(&self) -> &FormatState {
        &self.session.formats
    }

    pub fn focus_position(&self) -> Option<FocusPosition> {
        self.session.focus_position
    }

    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn pending_tasks(&self) -> usize {
        self.deferred.len()
    }

    // ---- lifecycle ------------------------------------------------------

    /// Configure the engine, load the initial value and register formats
    /// and shortcuts
    pub fn mount(&mut self) -> Result<(), SurfaceError> {
        let settings = EngineSettings::build(self.props.engine_options.clone(), &self.props.multiline);
        self.engine.configure(settings);

        self.engine.set_undo_tracking(false);
        let loaded = self.load_value(self.props.value.clone().as_ref());
        self.engine.set_undo_tracking(true);
        loaded?;

        self.session = FieldSessionState::new(self.props.value.clone(), self.is_empty());
        self.deferred = DeferredQueue::new();
        self.on_init();
        self.mounted = true;

        info!(
            tag = %self.props.tag_name,
            format = %self.props.format,
            instance = %self.props.instance_id,
            "field mounted"
        );
        Ok(())
    }

    /// Cancel deferred work and release pasted files
    pub fn unmount(&mut self) {
        self.deferred.cancel();
        self.announcer.cancel();
        let revoked = self.blobs.revoke_all();
        self.mounted = false;
        debug!(revoked, "field unmounted");
    }

    /// Take new props from the host
    ///
    /// A new tag remounts the field. A new value is written into the engine
    /// unless it's what the field already shows.
    pub fn set_props(&mut self, props: FieldProps) -> Result<(), SurfaceError> {
        let previous = std::mem::replace(&mut self.props, props);

        if previous.tag_name != self.props.tag_name {
            debug!(from = %previous.tag_name, to = %self.props.tag_name, "tag changed, remounting");
            self.unmount();
            return self.mount();
        }

        if self
            .session
            .needs_write_back(self.props.value.as_ref(), previous.value.as_ref())
        {
            self.update_content();
        }
        Ok(())
    }

    /// Replace only the value prop
    pub fn set_value(&mut self, value: Option<Value>) -> Result<(), SurfaceError> {
        let mut props = self.props.clone();
        props.value = value;
        self.set_props(props)
    }

    // ---- queries --------------------------------------------------------

    /// Empty per the value prop: absent, string-format, or no nodes
    pub fn is_empty(&self) -> bool {
        match &self.props.value {
            None => true,
            Some(value) => self.props.format == ValueFormat::String || value.node_count() == 0,
        }
    }

    pub fn is_placeholder_visible(&self) -> bool {
        self.props.placeholder.is_some()
            && (!self.props.is_selected || self.props.keep_placeholder_on_focus)
            && self.is_empty()
    }

    pub fn is_format_active(&self, name: &str) -> bool {
        self.session
            .formats
            .get(name)
            .is_some_and(|descriptor| descriptor.is_active)
    }

    /// Current engine content as a value
    pub fn get_content(&self) -> Value {
        let body = self.engine.body();
        let dom = self.engine.dom();
        self.converter.to_value(dom, dom.children(body), self.props.format)
    }

    // ---- dispatch -------------------------------------------------------

    /// Handle one engine notification
    pub fn handle(&mut self, notification: Notification) -> EventResponse {
        trace!(kind = notification.kind(), "notification");

        match notification {
            Notification::Init => {
                self.on_init();
                EventResponse::proceed()
            }
            Notification::Focus => {
                if self.host.capabilities().focus {
                    self.host.set_focused_element(&self.props.instance_id);
                }
                EventResponse::proceed()
            }
            Notification::FocusOut => {
                let body = self.engine.body();
                if let Err(error) = self.boundary.strip_from_subtree(self.engine.dom_mut(), body) {
                    warn!(error = %error, "failed to strip boundary sentinels");
                }
                EventResponse::proceed()
            }
            Notification::Input => {
                self.session.undo.on_input();
                self.emit_change();
                EventResponse::proceed()
            }
            Notification::ContentSettled { initial_level, origin } => {
                self.on_content_settled(initial_level, origin);
                EventResponse::proceed()
            }
            Notification::NodeChange => {
                self.on_node_change();
                EventResponse::proceed()
            }
            Notification::KeyDown(event) => self.on_key_down(event),
            Notification::KeyUp(event) => {
                self.on_key_up(event);
                EventResponse::proceed()
            }
            Notification::NewBlock => {
                self.on_new_block();
                EventResponse::proceed()
            }
            Notification::BeforeExecCommand(command) => self.on_before_exec_command(&command),
            Notification::Paste(payload) => self.on_paste(payload),
            Notification::PastePreProcess { content } => self.on_paste_pre_process(content),
            Notification::Shortcut(shortcut) => {
                self.on_shortcut(shortcut);
                EventResponse::prevented()
            }
        }
    }

    /// Forward everything the engine has queued
    pub fn pump(&mut self) -> Vec<EventResponse> {
        let mut responses = Vec::new();
        loop {
            let batch = self.engine.drain_notifications();
            if batch.is_empty() {
                return responses;
            }
            for notification in batch {
                responses.push(self.handle(notification));
            }
        }
    }

    /// Run a whole paste: the raw event, then pre-processing, then the
    /// engine's default insertion unless a handler took over
    pub fn paste(&mut self, payload: PastePayload) -> EventResponse {
        let content = match payload.html.as_deref() {
            Some(html) if !html.is_empty() && !payload.is_plain_text_only() => html.to_string(),
            _ => {
                let mut escaped = String::new();
                escape_text(payload.plain_text(), &mut escaped);
                escaped.replace('\n', "<br>")
            }
        };

        let response = self.handle(Notification::Paste(payload));
        if response.prevent_default {
            return response;
        }

        let response = self.handle(Notification::PastePreProcess {
            content: content.clone(),
        });
        if !response.prevent_default {
            let insert = response.content.clone().unwrap_or(content);
            self.exec(EngineCommand::InsertContent(insert));
        }
        response
    }

    /// Run tasks deferred to the host's next tick; returns how many ran
    pub fn run_deferred(&mut self) -> usize {
        let tasks = self.deferred.take_ready();
        let count = tasks.len();

        for task in tasks {
            trace!(?task, "running deferred task");
            match task {
                DeferredTask::Split(blocks) => self.split_content(blocks),
                DeferredTask::Replace(blocks) => self.host.on_replace(blocks),
                DeferredTask::Undo => self.host.on_undo(),
                DeferredTask::Redo => self.host.on_redo(),
            }
        }
        count
    }

    // ---- formats --------------------------------------------------------

    /// Apply toolbar format changes, then merge them into the tracked state
    pub fn change_formats(&mut self, changes: Vec<(String, FormatChange)>) {
        for (name, change) in &changes {
            match change {
                FormatChange::Link(LinkChange::Adding) => {}
                FormatChange::Link(LinkChange::Set { href, target }) => {
                    self.exec(EngineCommand::InsertLink {
                        href: href.clone(),
                        target: target.clone(),
                    });
                }
                FormatChange::Link(LinkChange::Remove) => self.exec(EngineCommand::Unlink),
                FormatChange::Toggle(enable) => {
                    let active = self.is_format_active(name);
                    if active && !enable {
                        self.exec(EngineCommand::RemoveFormat(name.clone()));
                    } else if !active && *enable {
                        self.exec(EngineCommand::ApplyFormat {
                            name: name.clone(),
                            attributes: Default::default(),
                        });
                    }
                }
            }
        }

        for (name, change) in &changes {
            change.merge_into(name, &mut self.session.formats);
        }
    }

    // ---- announcements --------------------------------------------------

    pub fn announce(&mut self, message: impl Into<String>, now: Instant) {
        self.announcer.announce(message, now);
    }

    pub fn announce_result_count(&mut self, count: usize, now: Instant) {
        self.announcer.announce(result_count_message(count), now);
    }

    pub fn poll_announcement(&mut self, now: Instant) -> Option<String> {
        self.announcer.poll(now)
    }

    // ---- handlers -------------------------------------------------------

    fn on_init(&mut self) {
        for formatter in &self.props.formatters {
            self.engine.register_formatter(
                &formatter.format,
                FormatDefinition::inline_style(formatter.style.clone()),
            );
        }

        let shortcuts = [
            (Shortcut::primary('k'), ShortcutAction::Field(FieldShortcut::AddLink)),
            (Shortcut::access('a'), ShortcutAction::Field(FieldShortcut::AddLink)),
            (Shortcut::access('s'), ShortcutAction::Field(FieldShortcut::RemoveLink)),
            (
                Shortcut::access('d'),
                ShortcutAction::Field(FieldShortcut::ToggleFormat("strikethrough".into())),
            ),
            (
                Shortcut::access('x'),
                ShortcutAction::Field(FieldShortcut::ToggleFormat("code".into())),
            ),
            (Shortcut::primary('z'), ShortcutAction::Command(EngineCommand::Undo)),
            (Shortcut::primary_shift('z'), ShortcutAction::Command(EngineCommand::Redo)),
        ];
        for (shortcut, action) in shortcuts {
            self.engine.add_shortcut(shortcut, action);
        }

        // Redo is primary+shift+z only
        if let Some(redo) = Shortcut::parse("meta+y") {
            self.engine.remove_shortcut(&redo);
        }
    }

    fn on_content_settled(&mut self, initial_level: bool, origin: ChangeOrigin) {
        match self.session.undo.on_content_settled(initial_level, origin) {
            CheckpointDecision::Skip => {}
            CheckpointDecision::Checkpoint { resync } => {
                if resync {
                    self.emit_change();
                }
                self.host.create_undo_level();
            }
        }
    }

    fn on_node_change(&mut self) {
        let Some(tracked) = self.tracker.track(&self.engine, &self.props.formatting_controls) else {
            return;
        };
        let rect = tracked.anchor_rect;
        self.session.apply_tracked(tracked);

        if self.props.is_viewport_small {
            self.tracker.scroll_to_rect(&mut self.engine, rect);
        }
    }

    fn on_key_down(&mut self, event: KeyEvent) -> EventResponse {
        if let Some(action) = self.engine.match_shortcut(&event) {
            trace!(?action, "shortcut");
            match action {
                ShortcutAction::Command(command) => self.exec(command),
                ShortcutAction::Field(shortcut) => self.on_shortcut(shortcut),
            }
            return EventResponse::prevented();
        }

        match event.key {
            Key::Backspace | Key::Delete => self.on_delete_key_down(event.key),
            Key::Left | Key::Right => self.on_horizontal_navigation(event.key == Key::Left),
            Key::Enter => self.on_enter(event),
            _ => EventResponse::proceed(),
        }
    }

    fn on_delete_key_down(&mut self, key: Key) -> EventResponse {
        let capabilities = self.host.capabilities();
        if !capabilities.merge && !capabilities.remove {
            return EventResponse::proceed();
        }

        let Some(forward) = self.split_merge.merge_direction(
            self.engine.dom(),
            self.engine.body(),
            self.engine.selection(),
            key,
        ) else {
            return EventResponse::proceed();
        };

        self.checkpoint();
        if capabilities.merge {
            self.host.on_merge(forward);
        }
        if capabilities.remove && self.is_empty() {
            self.host.on_remove(forward);
        }
        debug!(forward, "merge at field edge");
        EventResponse::consumed()
    }

    fn on_horizontal_navigation(&mut self, reverse: bool) -> EventResponse {
        let Some(selection) = self.engine.selection() else {
            return EventResponse::proceed();
        };

        if self
            .boundary
            .crosses_sentinel(self.engine.dom(), selection.focus, reverse)
        {
            EventResponse::stopped()
        } else {
            EventResponse::proceed()
        }
    }

    fn on_enter(&mut self, event: KeyEvent) -> EventResponse {
        let can_split = self.host.capabilities().split;
        let body = self.engine.body();
        let selection = self.engine.selection();

        let action = self.split_merge.plan_enter(
            self.engine.dom_mut(),
            body,
            selection,
            &self.props.multiline,
            event.shift,
            can_split,
            self.props.format,
        );

        match action {
            Ok(EnterAction::Ignore) => EventResponse::proceed(),
            Ok(EnterAction::LineBreak) => {
                self.checkpoint();
                self.exec(EngineCommand::InsertLineBreak);
                EventResponse::prevented()
            }
            Ok(EnterAction::Split(parts)) => {
                self.checkpoint();
                self.restore_content_and_split(parts, Vec::new());
                EventResponse::prevented()
            }
            Err(error) => {
                warn!(error = %error, "enter handling failed");
                EventResponse::prevented()
            }
        }
    }

    fn on_key_up(&mut self, event: KeyEvent) {
        // Deleting a fully selected field doesn't raise input
        if event.key == Key::Backspace {
            self.emit_change();
        }

        if self.props.is_viewport_small && event.key != Key::Backspace && event.key != Key::Enter {
            if let Some(selection) = self.engine.selection() {
                let range = selection.range(self.engine.dom(), self.engine.body());
                let rect = self.engine.range_rect(range);
                self.tracker.scroll_to_rect(&mut self.engine, rect);
            }
        }
    }

    fn on_new_block(&mut self) {
        if self.props.multiline.tag() != Some("p") || !self.host.capabilities().split {
            return;
        }
        let Some(selection) = self.engine.selection() else {
            return;
        };

        let body = self.engine.body();
        let range = selection.range(self.engine.dom(), body);
        let Some(parts) = self
            .split_merge
            .new_block_parts(self.engine.dom(), body, range.start, self.props.format)
        else {
            return;
        };

        if let Err(error) = self.load_value(self.props.value.clone().as_ref()) {
            warn!(error = %error, "failed to restore content before split");
            return;
        }
        self.restore_content_and_split(parts, Vec::new());
    }

    fn on_before_exec_command(&mut self, command: &EngineCommand) -> EventResponse {
        let capabilities = self.host.capabilities();
        let task = match command {
            EngineCommand::Undo if capabilities.undo => DeferredTask::Undo,
            EngineCommand::Redo if capabilities.redo => DeferredTask::Redo,
            _ => return EventResponse::proceed(),
        };

        debug!(command = %command, "forwarding history command to host");
        self.deferred.schedule(task);
        EventResponse::prevented()
    }

    fn on_shortcut(&mut self, shortcut: FieldShortcut) {
        let change = match shortcut {
            FieldShortcut::AddLink => ("link".to_string(), FormatChange::Link(LinkChange::Adding)),
            FieldShortcut::RemoveLink => ("link".to_string(), FormatChange::Link(LinkChange::Remove)),
            FieldShortcut::ToggleFormat(name) => {
                let enable = !self.is_format_active(&name);
                (name, FormatChange::Toggle(enable))
            }
        };
        self.change_formats(vec![change]);
    }

    fn on_paste(&mut self, payload: PastePayload) -> EventResponse {
        let mut response = EventResponse::proceed();

        if let Some(file) = self.paste.image_file(&payload) {
            let url = self.blobs.create(file.clone());
            debug!(name = %file.name, mime_type = %file.mime_type, url = %url, "Received item");

            let html = format!("<img src=\"{}\">", url);
            let blocks = match self.normalizer.normalize(&NormalizeRequest {
                html: &html,
                plain_text: "",
                mode: PasteMode::Blocks,
                tag_name: &self.props.tag_name,
                can_use_unfiltered_markup: self.props.can_use_unfiltered_markup,
            }) {
                Normalized::Blocks(blocks) => blocks,
                Normalized::Inline(_) => Vec::new(),
            };

            match self.paste.block_route(self.is_empty(), &self.host.capabilities()) {
                BlockRoute::Replace => {
                    self.deferred.schedule(DeferredTask::Replace(blocks));
                }
                BlockRoute::Split => {
                    self.deferred.schedule(DeferredTask::Split(blocks));
                }
                BlockRoute::Unhandled => {}
            }
            response = EventResponse::prevented();
        }

        self.session
            .begin_paste(payload.plain_text.clone(), payload.is_plain_text_only());
        response
    }

    fn on_paste_pre_process(&mut self, content: String) -> EventResponse {
        let html = if self.session.is_plain_text_paste {
            String::new()
        } else {
            content.clone()
        };
        let plain_text = self.session.pending_plain_text.clone().unwrap_or_default();
        debug!(html = %html, "Received HTML");
        debug!(plain_text = %plain_text, "Received plain text");

        if !self.engine.is_collapsed() {
            let selected = match self.engine.selected_html() {
                Ok(selected) => selected,
                Err(error) => {
                    warn!(error = %error, "failed to read selection");
                    String::new()
                }
            };
            if let Some(href) = self.paste.link_over_selection(&content, &selected) {
                self.exec(EngineCommand::InsertLink { href, target: None });
                debug!("Created link");
                return EventResponse::prevented();
            }
        }

        let field_is_empty = self.is_empty();
        let capabilities = self.host.capabilities();
        let mode = self.paste.mode(field_is_empty, &capabilities);
        let normalized = self.normalizer.normalize(&NormalizeRequest {
            html: &html,
            plain_text: &plain_text,
            mode,
            tag_name: &self.props.tag_name,
            can_use_unfiltered_markup: self.props.can_use_unfiltered_markup,
        });

        match self.paste.outcome(normalized, field_is_empty, &capabilities) {
            PasteOutcome::Insert(content) => EventResponse::proceed().with_content(content),
            PasteOutcome::Passthrough => EventResponse::proceed(),
            PasteOutcome::Discard => EventResponse::prevented(),
            PasteOutcome::Replace(blocks) => {
                self.host.on_replace(blocks);
                EventResponse::prevented()
            }
            PasteOutcome::Split(blocks) => {
                self.split_content(blocks);
                EventResponse::prevented()
            }
        }
    }

    // ---- shared steps ---------------------------------------------------

    /// Split the field around the selection, with `blocks` in between
    pub fn split_content(&mut self, blocks: Vec<Block>) {
        if !self.host.capabilities().split {
            return;
        }

        let body = self.engine.body();
        let parts = match self.engine.selection() {
            Some(selection) => {
                let range = selection.range(self.engine.dom(), body);
                self.split_merge
                    .split_at(self.engine.dom_mut(), body, range, self.props.format)
            }
            None => Ok(SplitParts::empty(self.props.format)),
        };

        match parts {
            Ok(parts) => self.restore_content_and_split(parts, blocks),
            Err(error) => warn!(error = %error, "failed to split field"),
        }
    }

    /// Put back the host's value, then report the split. The host never
    /// sees a field showing what the engine did before the split.
    fn restore_content_and_split(&mut self, parts: SplitParts, blocks: Vec<Block>) {
        self.update_content();
        debug!(blocks = blocks.len(), "split field");
        self.host.on_split(parts.before, parts.after, blocks);
    }

    /// Emit the current content and record a host checkpoint
    fn checkpoint(&mut self) {
        self.session.undo.on_explicit_checkpoint();
        self.emit_change();
        self.host.create_undo_level();
    }

    fn emit_change(&mut self) {
        let value = self.get_content();
        self.session.record_emit(value.clone());
        self.host.on_change(value);
    }

    /// Write the value prop into the engine without touching undo history
    /// or moving the caret
    fn update_content(&mut self) {
        self.engine.set_undo_tracking(false);
        let bookmark = self.engine.create_bookmark();
        self.session.saved_content = self.props.value.clone();

        if let Err(error) = self.load_value(self.props.value.clone().as_ref()) {
            warn!(error = %error, "failed to write value into engine");
        }
        if let Some(bookmark) = bookmark {
            self.engine.restore_bookmark(bookmark);
        }
        self.engine.set_undo_tracking(true);
    }

    fn load_value(&mut self, value: Option<&Value>) -> Result<(), EngineError> {
        let html = self.converter.from_value(value, self.props.format);
        self.engine.set_content(&html)
    }

    /// Run a command, giving the surface a look at it first
    fn exec(&mut self, command: EngineCommand) {
        let response = self.handle(Notification::BeforeExecCommand(command.clone()));
        if response.prevent_default {
            return;
        }
        if let Err(error) = self.engine.exec_command(command.clone()) {
            warn!(error = %error, command = %command, "command failed");
        }
    }
}
