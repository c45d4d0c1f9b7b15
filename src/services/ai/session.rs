//! Per-report conversation session.
//!
//! One session mediates one user's multi-turn Q&A about one report. The
//! server assigns a conversation id on the first successful answer; later
//! requests carry it so the dialogue keeps its context. Submissions are
//! serialized: while a question is outstanding no second one can start, which
//! is what guarantees exchange order equals submission order.
//!
//! Reset and report switch bump the session epoch. A completion that observes
//! a different epoch than the one it started under is stale and is dropped
//! instead of being appended to a session the user has since abandoned.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::services::error::PortalError;
use crate::services::history::{HistoryApi, SaveHistoryRequest};
use crate::services::session::SessionStore;

use super::client::AiQueryApi;
use super::types::{Exchange, ExchangeRole, QueryRequest};

struct ConversationState {
    report_id: i64,
    conversation_id: Option<String>,
    exchanges: Vec<Exchange>,
    suggestions: Vec<String>,
    pending_input: Option<String>,
    last_error: Option<String>,
}

pub struct AiConversationSession {
    api: Arc<dyn AiQueryApi>,
    history: Arc<dyn HistoryApi>,
    session: Arc<SessionStore>,
    // NOTE: std::sync::Mutex; the lock is never held across .await.
    state: Mutex<ConversationState>,
    epoch: AtomicU64,
    in_flight: AtomicBool,
}

impl AiConversationSession {
    pub fn new(
        api: Arc<dyn AiQueryApi>,
        history: Arc<dyn HistoryApi>,
        session: Arc<SessionStore>,
        report_id: i64,
    ) -> Self {
        Self {
            api,
            history,
            session,
            state: Mutex::new(ConversationState {
                report_id,
                conversation_id: None,
                exchanges: Vec::new(),
                suggestions: Vec::new(),
                pending_input: None,
                last_error: None,
            }),
            epoch: AtomicU64::new(0),
            in_flight: AtomicBool::new(false),
        }
    }

    fn state(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn report_id(&self) -> i64 {
        self.state().report_id
    }

    pub fn conversation_id(&self) -> Option<String> {
        self.state().conversation_id.clone()
    }

    pub fn exchanges(&self) -> Vec<Exchange> {
        self.state().exchanges.clone()
    }

    pub fn suggestions(&self) -> Vec<String> {
        self.state().suggestions.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().last_error.clone()
    }

    /// True while a question is outstanding; the input stays disabled.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Stage a recalled question without submitting it; the user confirms
    /// explicitly via [`submit_pending`](Self::submit_pending).
    pub fn recall_question(&self, text: &str) {
        self.state().pending_input = Some(text.to_string());
    }

    pub fn pending_input(&self) -> Option<String> {
        self.state().pending_input.clone()
    }

    pub async fn submit_pending(&self) -> Result<bool, PortalError> {
        let staged = self.state().pending_input.take();
        match staged {
            Some(text) => self.submit_question(&text).await,
            None => Ok(false),
        }
    }

    /// Submit one question. Returns `Ok(false)` without side effects for
    /// whitespace-only input or while another question is outstanding.
    ///
    /// The user exchange is appended synchronously as a provisional entry and
    /// resolved when the request completes: either an `ai` exchange follows
    /// it, or an `error` exchange with the fixed fallback message. A failure
    /// never ends the session.
    pub async fn submit_question(&self, text: &str) -> Result<bool, PortalError> {
        let question = text.trim();
        if question.is_empty() {
            return Ok(false);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(false);
        }

        let Some(user_id) = self.session.user_id() else {
            self.in_flight.store(false, Ordering::SeqCst);
            return Err(PortalError::auth("no signed-in user"));
        };

        let epoch = self.epoch.load(Ordering::SeqCst);
        let (report_id, conversation_id) = {
            let mut state = self.state();
            state.last_error = None;
            state.exchanges.push(Exchange::pending_user(question));
            (state.report_id, state.conversation_id.clone())
        };

        let request = QueryRequest {
            question: question.to_string(),
            report_id,
            user_id: user_id.clone(),
            conversation_id,
        };
        let result = self.api.query(&request).await;

        match result {
            Ok(response) => {
                {
                    let mut state = self.state();
                    // Stale check lives under the same lock reset() clears
                    // under; a completion that lost the race can never land
                    // in a cleared session. The reset already released the
                    // gate, so leave in_flight alone.
                    if self.epoch.load(Ordering::SeqCst) != epoch {
                        return Ok(true);
                    }
                    resolve_pending_user(&mut state.exchanges);
                    if state.conversation_id.is_none() {
                        state.conversation_id = response.conversation_id.clone();
                    }
                    state.exchanges.push(Exchange::ai(&response));
                }
                self.persist_exchange(SaveHistoryRequest {
                    report_id,
                    user_id,
                    question: question.to_string(),
                    answer: response.answer,
                });
            }
            Err(err) => {
                let mut state = self.state();
                if self.epoch.load(Ordering::SeqCst) != epoch {
                    return Ok(true);
                }
                resolve_pending_user(&mut state.exchanges);
                state.exchanges.push(Exchange::error());
                state.last_error = Some(err.message().to_string());
            }
        }

        self.in_flight.store(false, Ordering::SeqCst);
        Ok(true)
    }

    /// Persist a completed exchange to the history log, fire-and-forget.
    /// Failures are logged and never surface or roll anything back.
    fn persist_exchange(&self, request: SaveHistoryRequest) {
        let history = self.history.clone();
        tokio::spawn(async move {
            if let Err(err) = history.save(&request).await {
                log::warn!(
                    "history save for report {} failed: {err}",
                    request.report_id
                );
            }
        });
    }

    /// Clear the live conversation. Persisted history is untouched.
    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = self.state();
            state.exchanges.clear();
            state.conversation_id = None;
            state.last_error = None;
        }
        self.in_flight.store(false, Ordering::SeqCst);
    }

    /// Reset and retarget the session, then refresh suggested questions.
    pub async fn switch_report(&self, report_id: i64) {
        self.reset();
        {
            let mut state = self.state();
            state.report_id = report_id;
            state.suggestions.clear();
            state.pending_input = None;
        }
        self.refresh_suggestions().await;
    }

    /// Suggestion fetch failures are logged and leave the list unchanged.
    pub async fn refresh_suggestions(&self) {
        let report_id = self.state().report_id;
        match self.api.suggestions(report_id).await {
            Ok(suggestions) => self.state().suggestions = suggestions,
            Err(err) => {
                log::warn!("suggestion fetch for report {report_id} failed: {err}");
            }
        }
    }
}

fn resolve_pending_user(exchanges: &mut [Exchange]) {
    if let Some(user) = exchanges
        .iter_mut()
        .rev()
        .find(|e| e.role == ExchangeRole::User && e.pending)
    {
        user.pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ai::types::{QueryResponse, AI_FALLBACK_ANSWER};
    use crate::services::history::HistoryPage;
    use crate::services::session::Identity;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::{Notify, Semaphore};

    struct FakeAiApi {
        responses: Mutex<VecDeque<Result<QueryResponse, PortalError>>>,
        requests: Mutex<Vec<QueryRequest>>,
        suggestions: Vec<String>,
        gate: Option<Semaphore>,
    }

    impl FakeAiApi {
        fn answering(responses: Vec<Result<QueryResponse, PortalError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
                suggestions: vec!["이번 달 매출은?".to_string()],
                gate: None,
            }
        }

        fn gated(responses: Vec<Result<QueryResponse, PortalError>>) -> Self {
            let mut api = Self::answering(responses);
            api.gate = Some(Semaphore::new(0));
            api
        }

        fn requests(&self) -> Vec<QueryRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AiQueryApi for FakeAiApi {
        async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, PortalError> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(gate) = &self.gate {
                let _permit = gate.acquire().await.unwrap();
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(PortalError::ai_query("no scripted response")))
        }

        async fn suggestions(&self, report_id: i64) -> Result<Vec<String>, PortalError> {
            let mut suggestions = self.suggestions.clone();
            suggestions.push(format!("report-{report_id}"));
            Ok(suggestions)
        }
    }

    struct FakeHistory {
        saves: Mutex<Vec<SaveHistoryRequest>>,
        saved: Notify,
        fail: bool,
    }

    impl FakeHistory {
        fn new() -> Self {
            Self {
                saves: Mutex::new(Vec::new()),
                saved: Notify::new(),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl HistoryApi for FakeHistory {
        async fn load_page(
            &self,
            _user_id: &str,
            _page: u32,
            _size: u32,
        ) -> Result<HistoryPage, PortalError> {
            Ok(HistoryPage {
                items: Vec::new(),
                total_pages: 1,
            })
        }

        async fn save(&self, request: &SaveHistoryRequest) -> Result<(), PortalError> {
            self.saves.lock().unwrap().push(request.clone());
            self.saved.notify_one();
            if self.fail {
                return Err(PortalError::fetch(Some(500), None, "history down"));
            }
            Ok(())
        }
    }

    fn answer(text: &str, conversation_id: &str) -> Result<QueryResponse, PortalError> {
        Ok(QueryResponse {
            answer: text.to_string(),
            data: vec![serde_json::json!({"month": "08", "sales": 1200})],
            references: vec!["2026-08 매출 리포트".to_string()],
            conversation_id: Some(conversation_id.to_string()),
        })
    }

    fn signed_in_session() -> Arc<SessionStore> {
        let store = Arc::new(SessionStore::new());
        store.sign_in(Identity {
            username: "analyst1".to_string(),
            role: "USER".to_string(),
            token: "tok".to_string(),
            expiry_time: "2026-12-31T00:00:00Z".to_string(),
        });
        store
    }

    fn conversation(
        api: Arc<FakeAiApi>,
        history: Arc<FakeHistory>,
    ) -> AiConversationSession {
        AiConversationSession::new(api, history, signed_in_session(), 7)
    }

    #[tokio::test]
    async fn test_exchanges_follow_submission_order() {
        let api = Arc::new(FakeAiApi::answering(vec![
            answer("전월 대비 5% 증가", "conv-1"),
            answer("상위 제품은 A입니다", "conv-1"),
        ]));
        let session = conversation(api.clone(), Arc::new(FakeHistory::new()));

        assert!(session.submit_question("매출 현황?").await.unwrap());
        assert!(session.submit_question("상위 제품은?").await.unwrap());

        let roles: Vec<ExchangeRole> = session.exchanges().iter().map(|e| e.role).collect();
        assert_eq!(
            roles,
            vec![
                ExchangeRole::User,
                ExchangeRole::Ai,
                ExchangeRole::User,
                ExchangeRole::Ai
            ]
        );
        let exchanges = session.exchanges();
        assert_eq!(exchanges[0].content, "매출 현황?");
        assert!(!exchanges[0].pending);
        assert_eq!(exchanges[1].content, "전월 대비 5% 증가");
        assert_eq!(exchanges[1].references.len(), 1);
    }

    #[tokio::test]
    async fn test_conversation_id_captured_then_reused() {
        let api = Arc::new(FakeAiApi::answering(vec![
            answer("첫 답변", "conv-1"),
            answer("둘째 답변", "conv-1"),
        ]));
        let session = conversation(api.clone(), Arc::new(FakeHistory::new()));

        session.submit_question("매출 현황?").await.unwrap();
        assert_eq!(session.conversation_id().as_deref(), Some("conv-1"));

        session.submit_question("추세는?").await.unwrap();
        let requests = api.requests();
        assert_eq!(requests[0].conversation_id, None);
        assert_eq!(requests[1].conversation_id.as_deref(), Some("conv-1"));
    }

    #[tokio::test]
    async fn test_blank_input_is_a_noop() {
        let api = Arc::new(FakeAiApi::answering(Vec::new()));
        let session = conversation(api.clone(), Arc::new(FakeHistory::new()));

        assert!(!session.submit_question("   ").await.unwrap());
        assert!(session.exchanges().is_empty());
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn test_failure_appends_error_exchange_and_session_stays_usable() {
        let api = Arc::new(FakeAiApi::answering(vec![
            Err(PortalError::ai_query("service unavailable")),
            answer("이제 됩니다", "conv-2"),
        ]));
        let session = conversation(api.clone(), Arc::new(FakeHistory::new()));

        session.submit_question("매출 현황?").await.unwrap();
        let exchanges = session.exchanges();
        assert_eq!(exchanges.len(), 2);
        assert_eq!(exchanges[1].role, ExchangeRole::Error);
        assert_eq!(exchanges[1].content, AI_FALLBACK_ANSWER);
        assert!(!exchanges[0].pending);
        assert_eq!(session.last_error().as_deref(), Some("service unavailable"));
        assert!(!session.is_busy());

        // Non-fatal: the next question goes through.
        session.submit_question("다시 시도").await.unwrap();
        assert_eq!(session.exchanges().len(), 4);
        assert_eq!(session.exchanges()[3].role, ExchangeRole::Ai);
    }

    #[tokio::test]
    async fn test_recall_stages_without_submitting() {
        let api = Arc::new(FakeAiApi::answering(vec![answer("답변", "conv-1")]));
        let session = conversation(api.clone(), Arc::new(FakeHistory::new()));

        session.recall_question("지난주 질문");
        assert_eq!(session.pending_input().as_deref(), Some("지난주 질문"));
        assert!(api.requests().is_empty());

        assert!(session.submit_pending().await.unwrap());
        assert!(session.pending_input().is_none());
        assert_eq!(api.requests()[0].question, "지난주 질문");

        // Nothing staged: confirming again is a no-op.
        assert!(!session.submit_pending().await.unwrap());
    }

    #[tokio::test]
    async fn test_reset_clears_conversation_but_not_report() {
        let api = Arc::new(FakeAiApi::answering(vec![
            answer("a", "conv-1"),
            answer("b", "conv-9"),
        ]));
        let session = conversation(api.clone(), Arc::new(FakeHistory::new()));

        session.submit_question("질문 1").await.unwrap();
        session.reset();
        assert!(session.exchanges().is_empty());
        assert!(session.conversation_id().is_none());
        assert_eq!(session.report_id(), 7);

        // A fresh dialogue starts without a conversation id.
        session.submit_question("질문 2").await.unwrap();
        assert_eq!(api.requests()[1].conversation_id, None);
        assert_eq!(session.conversation_id().as_deref(), Some("conv-9"));
    }

    #[tokio::test]
    async fn test_stale_answer_dropped_after_reset() {
        let api = Arc::new(FakeAiApi::gated(vec![answer("늦은 답변", "conv-1")]));
        let history = Arc::new(FakeHistory::new());
        let session = Arc::new(AiConversationSession::new(
            api.clone(),
            history,
            signed_in_session(),
            7,
        ));

        let submitting = {
            let session = session.clone();
            tokio::spawn(async move { session.submit_question("매출 현황?").await })
        };
        tokio::task::yield_now().await;
        assert!(session.is_busy());

        // While the question is outstanding a second submit is refused.
        assert!(!session.submit_question("끼어들기").await.unwrap());

        session.reset();
        api.gate.as_ref().unwrap().add_permits(1);
        submitting.await.unwrap().unwrap();

        assert!(session.exchanges().is_empty());
        assert!(session.conversation_id().is_none());
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_stale_failure_dropped_after_reset() {
        let api = Arc::new(FakeAiApi::gated(vec![Err(PortalError::ai_query(
            "late failure",
        ))]));
        let session = Arc::new(AiConversationSession::new(
            api.clone(),
            Arc::new(FakeHistory::new()),
            signed_in_session(),
            7,
        ));

        let submitting = {
            let session = session.clone();
            tokio::spawn(async move { session.submit_question("매출 현황?").await })
        };
        tokio::task::yield_now().await;
        session.reset();
        api.gate.as_ref().unwrap().add_permits(1);
        submitting.await.unwrap().unwrap();

        // The failure belongs to the abandoned dialogue: no error exchange,
        // no recorded error.
        assert!(session.exchanges().is_empty());
        assert!(session.last_error().is_none());
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_successful_exchange_is_persisted() {
        let api = Arc::new(FakeAiApi::answering(vec![answer("답변", "conv-1")]));
        let history = Arc::new(FakeHistory::new());
        let session = conversation(api, history.clone());

        session.submit_question("매출 현황?").await.unwrap();
        history.saved.notified().await;

        let saves = history.saves.lock().unwrap().clone();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].report_id, 7);
        assert_eq!(saves[0].user_id, "analyst1");
        assert_eq!(saves[0].question, "매출 현황?");
        assert_eq!(saves[0].answer, "답변");
    }

    #[tokio::test]
    async fn test_persistence_failure_never_surfaces() {
        let api = Arc::new(FakeAiApi::answering(vec![answer("답변", "conv-1")]));
        let history = Arc::new(FakeHistory::failing());
        let session = conversation(api, history.clone());

        session.submit_question("매출 현황?").await.unwrap();
        history.saved.notified().await;

        // The visible conversation is unaffected by the failed save.
        assert_eq!(session.exchanges().len(), 2);
        assert_eq!(session.exchanges()[1].role, ExchangeRole::Ai);
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn test_switch_report_resets_and_refreshes_suggestions() {
        let api = Arc::new(FakeAiApi::answering(vec![answer("답변", "conv-1")]));
        let session = conversation(api, Arc::new(FakeHistory::new()));

        session.submit_question("매출 현황?").await.unwrap();
        session.recall_question("스테이징된 질문");
        session.switch_report(8).await;

        assert_eq!(session.report_id(), 8);
        assert!(session.exchanges().is_empty());
        assert!(session.conversation_id().is_none());
        assert!(session.pending_input().is_none());
        assert!(session.suggestions().contains(&"report-8".to_string()));
    }
}
