//! The RPC channel
//!
//! Outbound requests are recorded in a pending table keyed by request ID
//! before the frame is written, so a response can never race ahead of its
//! record. Inbound requests are dispatched to the `RequestHandler`; inbound
//! responses complete and remove the pending record, exactly once.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

use crate::error::RpcError;
use crate::handler::{HandlerResult, RequestContext, RequestHandler};
use crate::message::{Envelope, Payload, Request, RequestBody, Response, ResponseBody};
use crate::transport::{Transport, TransportError};
use crate::Result;

/// Invoked once with the matching response, or with the reason none will come
pub type ResponseCallback = Box<dyn FnOnce(Result<Response>) + Send>;

struct PendingResponse {
    message_id: u64,
    request: RequestBody,
    deadline: Option<Instant>,
    callback: ResponseCallback,
}

pub struct Rpc {
    name: String,
    transport: Arc<dyn Transport>,
    handler: Arc<dyn RequestHandler>,
    request_timeout: Option<Duration>,
    last_message_id: AtomicU64,
    last_request_id: AtomicU64,
    pending: Mutex<HashMap<u64, PendingResponse>>,
    /// Set by `on_close`, under the pending lock
    closed: AtomicBool,
}

impl Rpc {
    pub fn new(
        name: impl Into<String>,
        transport: Arc<dyn Transport>,
        handler: Arc<dyn RequestHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            transport,
            handler,
            request_timeout: None,
            last_message_id: AtomicU64::new(0),
            last_request_id: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Pending requests older than `timeout` fail with `RpcError::Timeout`
    /// the next time `expire_pending` runs. `None` waits forever.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once `on_close` ran. A closed channel refuses new requests.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn next_message_id(&self) -> u64 {
        self.last_message_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn next_request_id(&self) -> u64 {
        self.last_request_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Send a request and return its request ID.
    ///
    /// With a callback, the request is tracked until answered. If the frame
    /// cannot be written the record is dropped again and the callback is
    /// never invoked.
    pub fn send_request(
        &self,
        body: RequestBody,
        callback: Option<ResponseCallback>,
    ) -> Result<u64> {
        let request_id = self.next_request_id();
        let message_id = self.next_message_id();
        let kind = body.kind();

        let tracked = callback.map(|callback| PendingResponse {
            message_id,
            request: body.clone(),
            deadline: self.request_timeout.map(|timeout| Instant::now() + timeout),
            callback,
        });

        let frame = serde_json::to_string(&Envelope::request(
            message_id,
            Request { request_id, body },
        ))?;

        {
            let mut pending = self.pending.lock();
            if self.closed.load(Ordering::Acquire) {
                tracing::debug!(channel = %self.name, request_id, kind, "Request on closed channel");
                return Err(TransportError::Closed.into());
            }
            if let Some(tracked) = tracked {
                pending.insert(request_id, tracked);
            }
        }

        if let Err(err) = self.transport.send(frame) {
            self.pending.lock().remove(&request_id);
            tracing::warn!(channel = %self.name, request_id, kind, error = %err, "Failed to send request");
            return Err(err.into());
        }

        tracing::debug!(channel = %self.name, request_id, message_id, kind, "Sent request");
        Ok(request_id)
    }

    /// Send a request and hand its outcome to `on_response`
    pub fn request<F>(&self, body: RequestBody, on_response: F) -> Result<u64>
    where
        F: FnOnce(Result<Response>) + Send + 'static,
    {
        self.send_request(body, Some(Box::new(on_response)))
    }

    /// Fire-and-forget request. Any response to it is dropped.
    pub fn notify(&self, body: RequestBody) -> Result<u64> {
        self.send_request(body, None)
    }

    /// Send a request and wait for its response
    pub async fn call(&self, body: RequestBody) -> Result<Response> {
        let (tx, rx) = oneshot::channel();
        self.request(body, move |result| {
            let _ = tx.send(result);
        })?;
        rx.await.map_err(|_| RpcError::Canceled)?
    }

    pub fn send_response(&self, response: Response) -> Result<()> {
        let message_id = self.next_message_id();
        let kind = response.body.kind();
        let response_id = response.response_id;

        let frame = serde_json::to_string(&Envelope::response(message_id, response))?;
        self.transport.send(frame)?;

        tracing::debug!(channel = %self.name, response_id, message_id, kind, "Sent response");
        Ok(())
    }

    /// Handle one inbound text frame.
    ///
    /// Malformed frames and unmatched responses are logged and dropped.
    /// An error return means the connection is no longer usable.
    pub fn on_message(&self, frame: &str) -> Result<()> {
        let envelope: Envelope = match serde_json::from_str(frame) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(channel = %self.name, error = %err, "Dropping malformed frame");
                return Ok(());
            }
        };

        match envelope.payload {
            Payload::Request(request) => self.on_request(envelope.message_id, request),
            Payload::Response(response) => {
                self.on_response(envelope.message_id, response);
                Ok(())
            }
        }
    }

    fn on_request(&self, message_id: u64, request: Request) -> Result<()> {
        let cx = RequestContext {
            request_id: request.request_id,
            message_id,
        };
        let kind = request.body.kind();
        tracing::debug!(channel = %self.name, request_id = cx.request_id, message_id, kind, "Received request");

        match self.dispatch(&cx, request.body) {
            Ok(Some(body)) => self.send_response(Response::new(cx.request_id, body)),
            Ok(None) => Ok(()),
            Err(err) => match err.to_response() {
                Some(error) => {
                    tracing::warn!(channel = %self.name, request_id = cx.request_id, kind, error = %err, "Request failed");
                    self.send_response(Response::new(
                        cx.request_id,
                        ResponseBody::ErrorResponse(error),
                    ))
                }
                None => {
                    tracing::error!(channel = %self.name, request_id = cx.request_id, kind, error = %err, "Peer sent a request this endpoint never accepts");
                    Err(err.into())
                }
            },
        }
    }

    fn dispatch(&self, cx: &RequestContext, body: RequestBody) -> HandlerResult {
        let handler = &self.handler;
        match body {
            RequestBody::ListSessionsRequest(req) => handler.handle_list_sessions(cx, req),
            RequestBody::CreateSessionRequest(req) => handler.handle_create_session(cx, req),
            RequestBody::ConnectToSessionRequest(req) => handler.handle_connect_to_session(cx, req),
            RequestBody::DisconnectFromSessionRequest(req) => {
                handler.handle_disconnect_from_session(cx, req)
            }
            RequestBody::SendStateRequest(req) => handler.handle_send_state(cx, req),
            RequestBody::OpenTabRequest(req) => handler.handle_open_tab(cx, req),
            RequestBody::CloseTabRequest(req) => handler.handle_close_tab(cx, req),
            RequestBody::NavigationRequest(req) => handler.handle_navigation(cx, req),
        }
    }

    fn on_response(&self, message_id: u64, response: Response) {
        let pending = self.pending.lock().remove(&response.response_id);
        let Some(pending) = pending else {
            tracing::debug!(
                channel = %self.name,
                response_id = response.response_id,
                message_id,
                kind = response.body.kind(),
                "Dropping response with no pending request"
            );
            return;
        };

        tracing::debug!(
            channel = %self.name,
            response_id = response.response_id,
            message_id,
            request_message_id = pending.message_id,
            kind = response.body.kind(),
            "Received response"
        );

        let failure = match &response.body {
            ResponseBody::ErrorResponse(error) => Some(RpcError::Remote {
                code: error.code,
                message: error.message.clone(),
            }),
            body if !body.answers(&pending.request) => Some(RpcError::UnexpectedResponse {
                expected: pending.request.kind(),
                got: body.kind(),
            }),
            _ => None,
        };

        match failure {
            Some(err) => (pending.callback)(Err(err)),
            None => (pending.callback)(Ok(response)),
        }
    }

    /// Report a transport-level error. Pending requests stay pending.
    pub fn on_error(&self, error: &str) {
        tracing::warn!(channel = %self.name, error, "Transport error");
    }

    /// Fail every pending request with `RpcError::Closed`
    pub fn on_close(&self) {
        let drained: Vec<(u64, PendingResponse)> = {
            let mut pending = self.pending.lock();
            self.closed.store(true, Ordering::Release);
            pending.drain().collect()
        };
        tracing::info!(channel = %self.name, pending = drained.len(), "Channel closed");

        for (request_id, pending) in drained {
            (pending.callback)(Err(RpcError::Closed { request_id }));
        }
    }

    /// Fail pending requests whose deadline is at or before `now`.
    /// Returns how many expired.
    pub fn expire_pending(&self, now: Instant) -> usize {
        let expired: Vec<(u64, PendingResponse)> = {
            let mut pending = self.pending.lock();
            let ids: Vec<u64> = pending
                .iter()
                .filter(|(_, p)| p.deadline.is_some_and(|deadline| deadline <= now))
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| pending.remove(&id).map(|p| (id, p)))
                .collect()
        };

        let count = expired.len();
        for (request_id, pending) in expired {
            tracing::warn!(channel = %self.name, request_id, kind = pending.request.kind(), "Request timed out");
            (pending.callback)(Err(RpcError::Timeout { request_id }));
        }
        count
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerError;
    use crate::message::*;
    use crate::transport::{ChannelTransport, TransportError};
    use tabsync_session::{Session, SessionType};
    use tabsync_tabs::Tab;

    #[derive(Default)]
    struct Recorder {
        frames: Mutex<Vec<String>>,
        closed: Mutex<bool>,
    }

    impl Recorder {
        fn take(&self) -> Vec<Envelope> {
            self.frames
                .lock()
                .drain(..)
                .map(|f| serde_json::from_str(&f).unwrap())
                .collect()
        }
    }

    impl Transport for Recorder {
        fn send(&self, frame: String) -> std::result::Result<(), TransportError> {
            if *self.closed.lock() {
                return Err(TransportError::Closed);
            }
            self.frames.lock().push(frame);
            Ok(())
        }
    }

    /// Accepts list/openTab/navigation, rejects session creation outright
    struct TestHandler;

    impl RequestHandler for TestHandler {
        fn handle_list_sessions(&self, _: &RequestContext, _: ListSessionsRequest) -> HandlerResult {
            Ok(Some(ResponseBody::ListSessionsResponse(
                ListSessionsResponse::default(),
            )))
        }

        fn handle_create_session(&self, _: &RequestContext, _: CreateSessionRequest) -> HandlerResult {
            Err(HandlerError::Unsupported("createSessionRequest"))
        }

        fn handle_connect_to_session(
            &self,
            _: &RequestContext,
            req: ConnectToSessionRequest,
        ) -> HandlerResult {
            Err(HandlerError::NotFound(format!("Session not found: {}", req.id)))
        }

        fn handle_disconnect_from_session(
            &self,
            _: &RequestContext,
            _: DisconnectFromSessionRequest,
        ) -> HandlerResult {
            Ok(Some(ResponseBody::DisconnectFromSessionResponse(
                DisconnectFromSessionResponse {},
            )))
        }

        fn handle_send_state(&self, _: &RequestContext, _: SendStateRequest) -> HandlerResult {
            Ok(None)
        }

        fn handle_open_tab(&self, _: &RequestContext, req: OpenTabRequest) -> HandlerResult {
            let tab = Tab::new(1, req.session_id, req.url)
                .map_err(|e| HandlerError::Invalid(e.to_string()))?;
            Ok(Some(ResponseBody::OpenTabResponse(OpenTabResponse { tab })))
        }

        fn handle_close_tab(&self, _: &RequestContext, _: CloseTabRequest) -> HandlerResult {
            Ok(Some(ResponseBody::CloseTabResponse(CloseTabResponse {})))
        }

        fn handle_navigation(&self, _: &RequestContext, _: NavigationRequest) -> HandlerResult {
            Ok(None)
        }
    }

    fn channel() -> (Arc<Rpc>, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let transport: Arc<dyn Transport> = recorder.clone();
        let rpc = Arc::new(Rpc::new("test", transport, Arc::new(TestHandler)));
        (rpc, recorder)
    }

    type Slot = Arc<Mutex<Vec<Result<Response>>>>;

    fn slot() -> Slot {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn record(slot: &Slot) -> impl FnOnce(Result<Response>) + Send + 'static {
        let slot = slot.clone();
        move |result| slot.lock().push(result)
    }

    fn response_frame(message_id: u64, response_id: u64, body: ResponseBody) -> String {
        serde_json::to_string(&Envelope::response(
            message_id,
            Response::new(response_id, body),
        ))
        .unwrap()
    }

    fn request_frame(message_id: u64, request_id: u64, body: RequestBody) -> String {
        serde_json::to_string(&Envelope::request(message_id, Request { request_id, body })).unwrap()
    }

    fn list_sessions() -> RequestBody {
        RequestBody::ListSessionsRequest(ListSessionsRequest {})
    }

    fn close_tab() -> RequestBody {
        RequestBody::CloseTabRequest(CloseTabRequest {
            session_id: 1,
            tab_id: 1,
        })
    }

    fn request_id_of(envelope: &Envelope) -> u64 {
        match &envelope.payload {
            Payload::Request(request) => request.request_id,
            Payload::Response(_) => panic!("expected a request"),
        }
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let (rpc, recorder) = channel();

        rpc.notify(list_sessions()).unwrap();
        rpc.notify(list_sessions()).unwrap();
        rpc.send_response(Response::new(
            9,
            ResponseBody::CloseTabResponse(CloseTabResponse {}),
        ))
        .unwrap();

        let sent = recorder.take();
        let message_ids: Vec<u64> = sent.iter().map(|e| e.message_id).collect();
        assert_eq!(message_ids, vec![1, 2, 3]);
        assert_eq!(request_id_of(&sent[0]), 1);
        assert_eq!(request_id_of(&sent[1]), 2);
        assert_eq!(rpc.pending_count(), 0);
    }

    #[test]
    fn test_out_of_order_responses_reach_their_callbacks() {
        let (rpc, _recorder) = channel();
        let first = slot();
        let second = slot();

        let first_id = rpc.request(list_sessions(), record(&first)).unwrap();
        let second_id = rpc.request(close_tab(), record(&second)).unwrap();
        assert_eq!(rpc.pending_count(), 2);

        rpc.on_message(&response_frame(
            1,
            second_id,
            ResponseBody::CloseTabResponse(CloseTabResponse {}),
        ))
        .unwrap();
        rpc.on_message(&response_frame(
            2,
            first_id,
            ResponseBody::ListSessionsResponse(ListSessionsResponse::default()),
        ))
        .unwrap();

        let first = first.lock();
        let second = second.lock();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].as_ref().unwrap().body.kind(), "listSessionsResponse");
        assert_eq!(second[0].as_ref().unwrap().body.kind(), "closeTabResponse");
        assert_eq!(rpc.pending_count(), 0);
    }

    #[test]
    fn test_duplicate_response_is_dropped() {
        let (rpc, _recorder) = channel();
        let results = slot();
        let id = rpc.request(close_tab(), record(&results)).unwrap();

        let frame = response_frame(1, id, ResponseBody::CloseTabResponse(CloseTabResponse {}));
        rpc.on_message(&frame).unwrap();
        rpc.on_message(&frame).unwrap();

        assert_eq!(results.lock().len(), 1);
    }

    #[test]
    fn test_unknown_response_is_dropped() {
        let (rpc, recorder) = channel();
        let results = slot();
        rpc.request(close_tab(), record(&results)).unwrap();
        recorder.take();

        rpc.on_message(&response_frame(
            1,
            42,
            ResponseBody::CloseTabResponse(CloseTabResponse {}),
        ))
        .unwrap();

        assert!(results.lock().is_empty());
        assert_eq!(rpc.pending_count(), 1);
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_error_response_fails_the_request() {
        let (rpc, _recorder) = channel();
        let results = slot();
        let id = rpc.request(close_tab(), record(&results)).unwrap();

        rpc.on_message(&response_frame(
            1,
            id,
            ResponseBody::ErrorResponse(ErrorResponse {
                code: ErrorCode::NotFound,
                message: "Session not found: 1".to_string(),
            }),
        ))
        .unwrap();

        let results = results.lock();
        assert!(matches!(
            results[0],
            Err(RpcError::Remote {
                code: ErrorCode::NotFound,
                ..
            })
        ));
    }

    #[test]
    fn test_mismatched_response_kind() {
        let (rpc, _recorder) = channel();
        let results = slot();
        let id = rpc.request(close_tab(), record(&results)).unwrap();

        rpc.on_message(&response_frame(
            1,
            id,
            ResponseBody::NavigationResponse(NavigationResponse {}),
        ))
        .unwrap();

        let results = results.lock();
        assert!(matches!(
            results[0],
            Err(RpcError::UnexpectedResponse {
                expected: "closeTabRequest",
                got: "navigationResponse"
            })
        ));
    }

    #[test]
    fn test_timeout_expires_only_overdue_requests() {
        let recorder = Arc::new(Recorder::default());
        let transport: Arc<dyn Transport> = recorder.clone();
        let rpc = Rpc::new("test", transport, Arc::new(TestHandler))
            .with_request_timeout(Some(Duration::from_secs(5)));
        let results = slot();

        let id = rpc.request(close_tab(), record(&results)).unwrap();

        assert_eq!(rpc.expire_pending(Instant::now()), 0);
        assert_eq!(rpc.expire_pending(Instant::now() + Duration::from_secs(6)), 1);
        assert_eq!(rpc.pending_count(), 0);
        assert!(matches!(
            results.lock()[0],
            Err(RpcError::Timeout { request_id }) if request_id == id
        ));

        // A late response after expiry is simply dropped
        rpc.on_message(&response_frame(
            1,
            id,
            ResponseBody::CloseTabResponse(CloseTabResponse {}),
        ))
        .unwrap();
        assert_eq!(results.lock().len(), 1);
    }

    #[test]
    fn test_no_timeout_means_no_expiry() {
        let (rpc, _recorder) = channel();
        rpc.request(close_tab(), |_| {}).unwrap();
        assert_eq!(rpc.expire_pending(Instant::now() + Duration::from_secs(3600)), 0);
        assert_eq!(rpc.pending_count(), 1);
    }

    #[test]
    fn test_close_fails_everything_pending() {
        let (rpc, _recorder) = channel();
        let results = slot();
        rpc.request(close_tab(), record(&results)).unwrap();
        rpc.request(list_sessions(), record(&results)).unwrap();

        rpc.on_close();

        let results = results.lock();
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| matches!(r, Err(RpcError::Closed { .. }))));
        assert_eq!(rpc.pending_count(), 0);
    }

    #[test]
    fn test_closed_channel_refuses_requests() {
        let (rpc, recorder) = channel();
        rpc.on_close();
        assert!(rpc.is_closed());

        let results = slot();
        let err = rpc.request(close_tab(), record(&results)).unwrap_err();
        assert!(matches!(err, RpcError::Transport(TransportError::Closed)));
        assert!(rpc.notify(close_tab()).is_err());

        assert_eq!(rpc.pending_count(), 0);
        assert!(results.lock().is_empty());
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_failed_send_is_not_tracked() {
        let (rpc, recorder) = channel();
        *recorder.closed.lock() = true;
        let results = slot();

        let err = rpc.request(close_tab(), record(&results)).unwrap_err();
        assert!(matches!(err, RpcError::Transport(TransportError::Closed)));
        assert_eq!(rpc.pending_count(), 0);
        assert!(results.lock().is_empty());
    }

    #[test]
    fn test_request_is_answered() {
        let (rpc, recorder) = channel();

        rpc.on_message(&request_frame(
            7,
            3,
            RequestBody::OpenTabRequest(OpenTabRequest {
                session_id: 4,
                url: "https://a".to_string(),
                tab_id: None,
            }),
        ))
        .unwrap();

        let sent = recorder.take();
        assert_eq!(sent.len(), 1);
        let Payload::Response(response) = &sent[0].payload else {
            panic!("expected a response");
        };
        assert_eq!(response.response_id, 3);
        let ResponseBody::OpenTabResponse(body) = &response.body else {
            panic!("expected openTabResponse");
        };
        assert_eq!(body.tab.session_id, 4);
    }

    #[test]
    fn test_handler_errors_become_error_responses() {
        let (rpc, recorder) = channel();

        rpc.on_message(&request_frame(
            1,
            5,
            RequestBody::ConnectToSessionRequest(ConnectToSessionRequest { id: 99 }),
        ))
        .unwrap();
        rpc.on_message(&request_frame(
            2,
            6,
            RequestBody::OpenTabRequest(OpenTabRequest {
                session_id: 1,
                url: "not a url".to_string(),
                tab_id: None,
            }),
        ))
        .unwrap();

        let codes: Vec<(u64, ErrorCode)> = recorder
            .take()
            .into_iter()
            .map(|e| match e.payload {
                Payload::Response(Response {
                    response_id,
                    body: ResponseBody::ErrorResponse(err),
                }) => (response_id, err.code),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(
            codes,
            vec![(5, ErrorCode::NotFound), (6, ErrorCode::InvalidRequest)]
        );
    }

    #[test]
    fn test_unsupported_request_is_fatal() {
        let (rpc, recorder) = channel();

        let err = rpc
            .on_message(&request_frame(
                1,
                1,
                RequestBody::CreateSessionRequest(CreateSessionRequest::default()),
            ))
            .unwrap_err();

        assert!(err.is_fatal());
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_handler_may_stay_silent() {
        let (rpc, recorder) = channel();

        rpc.on_message(&request_frame(
            1,
            1,
            RequestBody::SendStateRequest(SendStateRequest {
                session: Session::new(1, SessionType::Window),
            }),
        ))
        .unwrap();

        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_malformed_frames_are_dropped() {
        let (rpc, recorder) = channel();
        rpc.request(close_tab(), |_| {}).unwrap();
        recorder.take();

        for frame in ["", "{", "[]", r#"{"messageId":1}"#, r#"{"messageId":1,"request":{"requestId":1,"nope":{}}}"#] {
            rpc.on_message(frame).unwrap();
        }

        assert!(recorder.take().is_empty());
        assert_eq!(rpc.pending_count(), 1);
    }

    #[test]
    fn test_callback_can_issue_a_new_request() {
        let (rpc, recorder) = channel();
        let follow_up = slot();

        let chained = rpc.clone();
        let follow_up_slot = follow_up.clone();
        let id = rpc
            .request(list_sessions(), move |_| {
                chained
                    .request(close_tab(), record(&follow_up_slot))
                    .unwrap();
            })
            .unwrap();
        recorder.take();

        rpc.on_message(&response_frame(
            1,
            id,
            ResponseBody::ListSessionsResponse(ListSessionsResponse::default()),
        ))
        .unwrap();

        let sent = recorder.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(request_id_of(&sent[0]), 2);
        assert_eq!(rpc.pending_count(), 1);
        assert!(follow_up.lock().is_empty());
    }

    #[tokio::test]
    async fn test_call_resolves_with_response() {
        let (transport, mut outbound) = ChannelTransport::new();
        let rpc = Arc::new(Rpc::new("test", Arc::new(transport), Arc::new(TestHandler)));

        let caller = rpc.clone();
        let task = tokio::spawn(async move { caller.call(close_tab()).await });

        let frame = outbound.recv().await.unwrap();
        let envelope: Envelope = serde_json::from_str(&frame).unwrap();
        rpc.on_message(&response_frame(
            1,
            request_id_of(&envelope),
            ResponseBody::CloseTabResponse(CloseTabResponse {}),
        ))
        .unwrap();

        let response = task.await.unwrap().unwrap();
        assert_eq!(response.body, ResponseBody::CloseTabResponse(CloseTabResponse {}));
    }
}
