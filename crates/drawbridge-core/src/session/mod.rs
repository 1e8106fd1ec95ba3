//! Conversation state machine: submissions, streamed turns, tool-call
//! resolution, and automatic continuation once tool results settle.

pub mod continuation;
mod dispatcher;

pub use dispatcher::ToolDispatcher;

use std::sync::Arc;

use strum_macros::Display;
use tracing::{error, info, instrument, warn};

use drawbridge_tools::schema::ToolCall;
use drawbridge_tools::tools::DiagramTool;

use crate::canvas::{DiagramSurface, EXPORT_TIMEOUT, ExportError, ExportGateway};
use crate::conversation::{Attachment, Message, Part, Role};
use crate::error::{Error, Result};
use crate::transport::{ChatTransport, OutgoingTurn, SideChannel, TurnEvent};
use crate::utils::xml;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SessionStatus {
    Idle,
    Streaming,
    Error,
}

pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    surface: Arc<dyn DiagramSurface>,
    gateway: Arc<ExportGateway>,
    dispatcher: ToolDispatcher,
    messages: Vec<Message>,
    status: SessionStatus,
    last_error: Option<String>,
    pending_attachments: Vec<Attachment>,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn ChatTransport>, surface: Arc<dyn DiagramSurface>) -> Self {
        let gateway = Arc::new(ExportGateway::new(surface.clone()));
        let dispatcher = ToolDispatcher::new(gateway.clone(), surface.clone());
        Self {
            transport,
            surface,
            gateway,
            dispatcher,
            messages: Vec::new(),
            status: SessionStatus::Idle,
            last_error: None,
            pending_attachments: Vec::new(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The gateway the renderer's export callback must be wired to.
    pub fn gateway(&self) -> &Arc<ExportGateway> {
        &self.gateway
    }

    /// Stage a file to be sent with the next submission.
    pub fn attach(&mut self, attachment: Attachment) {
        self.pending_attachments.push(attachment);
    }

    /// Send a user message and drive the agent's turn to completion,
    /// including any automatic continuations after tool calls settle.
    ///
    /// The current diagram snapshot is fetched, normalized, and carried as
    /// side-channel context. Staged attachments are consumed.
    #[instrument(skip_all)]
    pub async fn submit(&mut self, text: &str) -> Result<()> {
        if self.status == SessionStatus::Streaming {
            return Err(Error::InvalidOperation(
                "a turn is already streaming".to_string(),
            ));
        }
        if text.trim().is_empty() {
            return Err(Error::InvalidOperation(
                "cannot submit an empty message".to_string(),
            ));
        }

        let snapshot = match self.fetch_normalized_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.fail(e.to_string());
                return Err(e.into());
            }
        };

        let mut parts = vec![Part::Text {
            text: text.to_string(),
        }];
        let staged = std::mem::take(&mut self.pending_attachments);
        parts.extend(staged.into_iter().map(Attachment::into_part));

        self.messages.push(Message::user(parts));
        self.last_error = None;
        self.run_turns(snapshot).await
    }

    /// Discard the conversation and reset the diagram to its default state.
    pub async fn clear(&mut self) {
        info!("clearing conversation and resetting diagram");
        self.messages.clear();
        self.pending_attachments.clear();
        self.surface.clear().await;
        self.status = SessionStatus::Idle;
        self.last_error = None;
    }

    /// Run turns until the continuation policy says the agent is done.
    async fn run_turns(&mut self, first_snapshot: String) -> Result<()> {
        let mut snapshot = first_snapshot;
        loop {
            self.run_turn(snapshot).await?;
            if !continuation::should_continue(&self.messages) {
                return Ok(());
            }
            info!("tool results settled, continuing agent turn");
            snapshot = match self.fetch_normalized_snapshot().await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    self.fail(e.to_string());
                    return Err(e.into());
                }
            };
        }
    }

    async fn run_turn(&mut self, snapshot: String) -> Result<()> {
        self.status = SessionStatus::Streaming;
        let turn = OutgoingTurn {
            messages: self.messages.clone(),
            tools: DiagramTool::schemas(),
            side_channel: SideChannel {
                diagram_xml: snapshot,
            },
        };

        let mut events = match self.transport.start_turn(turn).await {
            Ok(events) => events,
            Err(e) => {
                self.fail(e.to_string());
                return Err(e.into());
            }
        };

        self.messages.push(Message::assistant(Vec::new()));

        while let Some(event) = events.recv().await {
            match event {
                TurnEvent::TextDelta { text } => {
                    self.streaming_message().push_text_delta(&text);
                }
                TurnEvent::ToolCallStarted { id, name } => {
                    self.streaming_message().begin_tool_call(id, name);
                }
                TurnEvent::ToolCallReady { id, name, input } => {
                    if let Err(e) = self.resolve_tool_call(&id, &name, input).await {
                        self.fail(e.to_string());
                        return Err(e);
                    }
                }
                TurnEvent::Completed => break,
                TurnEvent::Failed { error } => {
                    warn!("turn failed mid-stream");
                    self.fail(error.to_string());
                    return Err(error.into());
                }
            }
        }

        self.status = SessionStatus::Idle;
        Ok(())
    }

    /// Execute a ready tool call and record its result on the streaming
    /// message. The stream does not advance past the call until this
    /// resolves.
    async fn resolve_tool_call(
        &mut self,
        id: &str,
        name: &str,
        input: serde_json::Value,
    ) -> Result<()> {
        self.streaming_message()
            .ready_tool_call(id, name, input.clone())?;

        let call = ToolCall {
            name: name.to_string(),
            parameters: input,
            id: id.to_string(),
        };
        let result = self.dispatcher.dispatch(&call).await;

        self.streaming_message().complete_tool_call(id, result)
    }

    /// The assistant message currently being streamed into. Transports are
    /// expected to emit events only between turn start and completion, but a
    /// missing message is recovered rather than panicked on.
    fn streaming_message(&mut self) -> &mut Message {
        if !matches!(self.messages.last(), Some(m) if m.role == Role::Assistant) {
            self.messages.push(Message::assistant(Vec::new()));
        }
        let index = self.messages.len() - 1;
        &mut self.messages[index]
    }

    async fn fetch_normalized_snapshot(&self) -> std::result::Result<String, ExportError> {
        let snapshot = self.gateway.fetch_current(EXPORT_TIMEOUT).await?;
        Ok(xml::normalize(&snapshot))
    }

    fn fail(&mut self, message: String) {
        error!("session error: {message}");
        self.status = SessionStatus::Error;
        self.last_error = Some(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::ToolCallState;
    use crate::test_utils::{DEFAULT_SNAPSHOT, ScriptedTransport, StubSurface};
    use crate::transport::TransportError;
    use drawbridge_tools::ToolResult;
    use drawbridge_tools::result::EditResult;
    use drawbridge_tools::tools::EDIT_DIAGRAM_TOOL_NAME;
    use serde_json::json;

    fn delta(text: &str) -> TurnEvent {
        TurnEvent::TextDelta {
            text: text.to_string(),
        }
    }

    fn started(id: &str, name: &str) -> TurnEvent {
        TurnEvent::ToolCallStarted {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn ready(id: &str, name: &str, input: serde_json::Value) -> TurnEvent {
        TurnEvent::ToolCallReady {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }
    }

    fn session_with(
        surface: &Arc<StubSurface>,
        script: Vec<Vec<TurnEvent>>,
    ) -> (ChatSession, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new(script));
        let session = ChatSession::new(transport.clone(), surface.clone());
        surface.wire_gateway(session.gateway());
        (session, transport)
    }

    #[tokio::test]
    async fn test_submit_carries_normalized_snapshot_as_side_channel() {
        let surface = Arc::new(StubSurface::with_snapshot(DEFAULT_SNAPSHOT));
        let (mut session, transport) =
            session_with(&surface, vec![vec![delta("Hi there."), TurnEvent::Completed]]);

        session.submit("Draw a box").await.unwrap();

        let turns = transport.turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(
            turns[0].side_channel.diagram_xml,
            "<mxGraphModel>\n  <root/>\n</mxGraphModel>"
        );
        assert_eq!(turns[0].tools.len(), 2);

        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[0].role, Role::User);
        assert_eq!(session.messages()[0].extract_text(), "Draw a box");
        assert_eq!(session.messages()[1].extract_text(), "Hi there.");
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_attachments_are_sent_once_then_cleared() {
        let surface = Arc::new(StubSurface::with_snapshot(DEFAULT_SNAPSHOT));
        let (mut session, _transport) = session_with(
            &surface,
            vec![
                vec![TurnEvent::Completed],
                vec![TurnEvent::Completed],
            ],
        );

        session.attach(Attachment::new("sketch.png", "image/png", vec![1, 2, 3]));
        session.submit("Use my sketch").await.unwrap();

        let file_parts = |message: &Message| {
            message
                .parts
                .iter()
                .filter(|p| matches!(p, Part::File { .. }))
                .count()
        };
        assert_eq!(file_parts(&session.messages()[0]), 1);

        session.submit("And now without it").await.unwrap();
        assert_eq!(file_parts(&session.messages()[2]), 0);
    }

    #[tokio::test]
    async fn test_edit_tool_call_resolves_and_turn_continues() {
        let surface = Arc::new(StubSurface::with_snapshot("<A/>"));
        let (mut session, transport) = session_with(
            &surface,
            vec![
                vec![
                    started("call_1", EDIT_DIAGRAM_TOOL_NAME),
                    ready(
                        "call_1",
                        EDIT_DIAGRAM_TOOL_NAME,
                        json!({"edits": [{"search": "A", "replace": "B"}]}),
                    ),
                    TurnEvent::Completed,
                ],
                vec![delta("Renamed the node."), TurnEvent::Completed],
            ],
        );

        session.submit("Rename A to B").await.unwrap();

        // The edit landed on the renderer and the turn resumed on its own.
        assert_eq!(surface.loaded_snapshots(), vec!["<B/>".to_string()]);
        let turns = transport.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].side_channel.diagram_xml, "<B/>");

        match &session.messages()[1].parts[0] {
            Part::ToolCall { state, output, .. } => {
                assert_eq!(*state, ToolCallState::OutputAvailable);
                assert_eq!(
                    *output,
                    Some(ToolResult::Edit(EditResult { edits_applied: 1 }))
                );
            }
            other => panic!("expected tool call part, got {other:?}"),
        }
        assert_eq!(session.messages()[2].extract_text(), "Renamed the node.");
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_text_only_turn_waits_for_the_user() {
        let surface = Arc::new(StubSurface::with_snapshot(DEFAULT_SNAPSHOT));
        let (mut session, transport) =
            session_with(&surface, vec![vec![delta("All done."), TurnEvent::Completed]]);

        session.submit("Thanks").await.unwrap();

        assert_eq!(transport.turns().len(), 1);
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_failed_edit_reports_back_and_still_continues() {
        let surface = Arc::new(StubSurface::with_snapshot("<A/>"));
        let (mut session, transport) = session_with(
            &surface,
            vec![
                vec![
                    started("call_1", EDIT_DIAGRAM_TOOL_NAME),
                    ready(
                        "call_1",
                        EDIT_DIAGRAM_TOOL_NAME,
                        json!({"edits": [{"search": "Z", "replace": "B"}]}),
                    ),
                    TurnEvent::Completed,
                ],
                vec![delta("Let me try again."), TurnEvent::Completed],
            ],
        );

        session.submit("Rename Z").await.unwrap();

        // The failure is visible to the agent, the diagram is untouched,
        // and the agent still gets its follow-up turn to self-correct.
        match &session.messages()[1].parts[0] {
            Part::ToolCall { state, output, .. } => {
                assert_eq!(*state, ToolCallState::OutputAvailable);
                let output = output.as_ref().unwrap();
                assert!(output.is_error());
                assert!(output.llm_format().contains("not found"));
            }
            other => panic!("expected tool call part, got {other:?}"),
        }
        assert!(surface.loaded_snapshots().is_empty());
        assert_eq!(transport.turns().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_export_timeout_aborts_submission() {
        let surface = Arc::new(StubSurface::silent());
        let (mut session, transport) = session_with(&surface, vec![]);

        let err = session.submit("Hello?").await.unwrap_err();

        assert!(matches!(err, Error::Export(ExportError::TimedOut(10))));
        assert_eq!(session.status(), SessionStatus::Error);
        assert!(
            session
                .last_error()
                .unwrap()
                .contains("timed out after 10 seconds")
        );
        // Nothing was sent: no turn started, no message recorded.
        assert!(transport.turns().is_empty());
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_recoverable_by_resubmitting() {
        let surface = Arc::new(StubSurface::with_snapshot(DEFAULT_SNAPSHOT));
        let (mut session, transport) = session_with(
            &surface,
            vec![vec![delta("Sure."), TurnEvent::Completed]],
        );
        transport.fail_next_start("connection reset");

        let err = session.submit("First try").await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(session.status(), SessionStatus::Error);
        assert!(session.last_error().unwrap().contains("connection reset"));

        session.submit("Second try").await.unwrap();
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn test_mid_stream_failure_keeps_streamed_parts() {
        let surface = Arc::new(StubSurface::with_snapshot(DEFAULT_SNAPSHOT));
        let (mut session, _transport) = session_with(
            &surface,
            vec![vec![
                delta("Working on"),
                TurnEvent::Failed {
                    error: TransportError::new("stream dropped"),
                },
            ]],
        );

        let err = session.submit("Hi").await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(session.status(), SessionStatus::Error);
        assert_eq!(session.messages()[1].extract_text(), "Working on");
    }

    #[tokio::test]
    async fn test_empty_submission_is_rejected() {
        let surface = Arc::new(StubSurface::with_snapshot(DEFAULT_SNAPSHOT));
        let (mut session, transport) = session_with(&surface, vec![]);

        let err = session.submit("   ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
        assert!(transport.turns().is_empty());
    }

    #[tokio::test]
    async fn test_clear_discards_history_and_resets_diagram() {
        let surface = Arc::new(StubSurface::with_snapshot("<A/>"));
        let (mut session, _transport) = session_with(
            &surface,
            vec![vec![delta("Hello."), TurnEvent::Completed]],
        );

        session.submit("Hi").await.unwrap();
        session.attach(Attachment::new("f.txt", "text/plain", vec![0]));
        session.clear().await;

        assert!(session.messages().is_empty());
        assert_eq!(surface.clear_calls(), 1);
        assert_eq!(surface.current_snapshot(), DEFAULT_SNAPSHOT);
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(session.last_error().is_none());

        // Cleared attachments do not leak into the next submission.
        session.submit("Fresh start").await.unwrap();
        assert!(
            session.messages()[0]
                .parts
                .iter()
                .all(|p| matches!(p, Part::Text { .. }))
        );
    }
}
