// End-to-end behaviour of the chat relay against a scripted provider.
// No network: every completion comes from `ScriptedProvider`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use profbs_agent::command::AdminCommand;
use profbs_agent::normalize::REFUSAL_REPLY;
use profbs_agent::prompt::{FREE_CHAT_PROMPT, KEYWORD_PROMPT};
use profbs_agent::provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError, Role};
use profbs_agent::relay::ACCESS_DENIED;
use profbs_agent::{ChatRelay, ChatStore, InboundHandler};
use profbs_core::types::{ChatId, ChatMode};

const ALLOWED: ChatId = ChatId(4242);

#[derive(Clone)]
enum Behavior {
    Reply(&'static str),
    ReplyAfter(&'static str, Duration),
    MissingChoice,
    Garbled,
}

#[derive(Default)]
struct CallLog {
    calls: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
}

impl CallLog {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

struct ScriptedProvider {
    behavior: Behavior,
    log: Arc<CallLog>,
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        self.log.calls.fetch_add(1, Ordering::SeqCst);
        self.log.requests.lock().unwrap().push(req.clone());

        let content = match &self.behavior {
            Behavior::Reply(text) => *text,
            Behavior::ReplyAfter(text, delay) => {
                tokio::time::sleep(*delay).await;
                *text
            }
            Behavior::MissingChoice => {
                return Err(ProviderError::MissingChoice {
                    body: r#"{"object":"chat.completion","choices":null}"#.to_string(),
                })
            }
            Behavior::Garbled => {
                return Err(ProviderError::Parse("expected value at line 1 column 1".to_string()))
            }
        };

        Ok(ChatResponse {
            content: content.to_string(),
            model: req.model.clone(),
            tokens_in: 10,
            tokens_out: 5,
            stop_reason: "stop".to_string(),
        })
    }
}

fn relay_with(behavior: Behavior, max_turns: usize) -> (Arc<ChatRelay>, Arc<CallLog>) {
    let log = Arc::new(CallLog::default());
    let provider = ScriptedProvider {
        behavior,
        log: Arc::clone(&log),
    };
    let relay = ChatRelay::new(
        Box::new(provider),
        Arc::new(ChatStore::new(max_turns)),
        ALLOWED,
        "gpt-4o".to_string(),
        500,
    );
    (Arc::new(relay), log)
}

#[tokio::test]
async fn unauthorized_chat_never_reaches_provider() {
    let (relay, log) = relay_with(Behavior::Reply("наушники"), 40);

    let reply = relay.handle_inbound(ChatId(1), "наушники").await;
    assert_eq!(reply, ACCESS_DENIED);

    // Admin phrases from strangers are rejected too.
    let reply = relay.handle_inbound(ChatId(1), "profbs admin").await;
    assert_eq!(reply, ACCESS_DENIED);

    assert_eq!(log.calls(), 0);
    assert!(relay.store().is_empty());
}

#[tokio::test]
async fn admin_phrase_switches_to_free_mode_without_api_call() {
    let (relay, log) = relay_with(Behavior::Reply("unused"), 40);

    let reply = relay.handle_inbound(ALLOWED, "profbs admin").await;
    assert_eq!(reply, AdminCommand::FreeChat.confirmation());
    assert_eq!(relay.store().mode(ALLOWED).await, ChatMode::Free);
    assert_eq!(log.calls(), 0);
    assert_eq!(relay.store().transcript_len(ALLOWED).await, 0);
}

#[tokio::test]
async fn admin_start_restores_keyword_mode() {
    let (relay, log) = relay_with(Behavior::Reply("unused"), 40);

    relay.handle_inbound(ALLOWED, "PROFBS ADMIN").await;
    let reply = relay.handle_inbound(ALLOWED, "  profbs admin start ").await;
    assert_eq!(reply, AdminCommand::KeywordMode.confirmation());
    assert_eq!(relay.store().mode(ALLOWED).await, ChatMode::Keyword);
    assert_eq!(log.calls(), 0);
}

#[tokio::test]
async fn keyword_mode_normalizes_reply_and_uses_keyword_prompt() {
    let (relay, log) = relay_with(
        Behavior::Reply("Беспроводные наушники для музыки для спорта"),
        40,
    );

    let reply = relay.handle_inbound(ALLOWED, "наушники").await;
    assert_eq!(reply, "беспроводные/наушники/для/музыки/спорта");

    let requests = log.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].system, KEYWORD_PROMPT);
    assert_eq!(requests[0].model, "gpt-4o");
    assert_eq!(requests[0].max_tokens, 500);

    let transcript = relay.store().transcript(ALLOWED).await;
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].role, Role::User);
    assert_eq!(transcript[0].content, "наушники");
    assert_eq!(transcript[1].role, Role::Assistant);
    assert_eq!(transcript[1].content, reply);
}

#[tokio::test]
async fn keyword_mode_passes_refusal_through() {
    let (relay, _log) = relay_with(
        Behavior::Reply("Пожалуйста отправьте название категории, я подберу ключевые слова"),
        40,
    );

    let reply = relay.handle_inbound(ALLOWED, "как дела?").await;
    assert_eq!(reply, REFUSAL_REPLY);
}

#[tokio::test]
async fn free_mode_leaves_reply_untouched() {
    let (relay, log) = relay_with(Behavior::Reply("Привет! Чем могу помочь?"), 40);

    relay.handle_inbound(ALLOWED, "profbs admin").await;
    let reply = relay.handle_inbound(ALLOWED, "Привет").await;
    assert_eq!(reply, "Привет! Чем могу помочь?");

    let requests = log.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].system, FREE_CHAT_PROMPT);
}

#[tokio::test]
async fn transcript_is_sent_in_order() {
    let (relay, log) = relay_with(Behavior::Reply("ответ"), 40);

    relay.handle_inbound(ALLOWED, "первый").await;
    relay.handle_inbound(ALLOWED, "  второй  ").await;

    let requests = log.requests();
    assert_eq!(requests.len(), 2);
    let second: Vec<(Role, &str)> = requests[1]
        .messages
        .iter()
        .map(|m| (m.role, m.content.as_str()))
        .collect();
    assert_eq!(
        second,
        vec![
            (Role::User, "первый"),
            (Role::Assistant, "ответ"),
            (Role::User, "второй"),
        ]
    );
}

#[tokio::test]
async fn failed_completion_leaves_transcript_untouched() {
    let (relay, log) = relay_with(Behavior::Garbled, 40);

    let reply = relay.handle_inbound(ALLOWED, "чайник").await;
    assert_eq!(reply, "Ошибка: Parse error: expected value at line 1 column 1");
    assert_eq!(log.calls(), 1);
    assert_eq!(relay.store().transcript_len(ALLOWED).await, 0);
}

#[tokio::test]
async fn missing_choice_quotes_raw_body() {
    let (relay, _log) = relay_with(Behavior::MissingChoice, 40);

    let reply = relay.handle_inbound(ALLOWED, "чайник").await;
    assert!(reply.starts_with("Ошибка API: "), "got {reply:?}");
    assert!(reply.contains(r#""choices":null"#));
    assert_eq!(relay.store().transcript_len(ALLOWED).await, 0);
}

#[tokio::test]
async fn transcript_window_is_enforced_through_relay() {
    let (relay, log) = relay_with(Behavior::Reply("ок"), 4);

    for text in ["a", "b", "c", "d"] {
        relay.handle_inbound(ALLOWED, text).await;
    }

    assert_eq!(relay.store().transcript_len(ALLOWED).await, 4);
    // Last request carried at most the window plus the new turn.
    let last = log.requests().pop().unwrap();
    assert_eq!(last.messages.len(), 5);
    assert_eq!(last.messages[0].content, "b");
}

#[tokio::test]
async fn same_chat_messages_are_serialized() {
    let (relay, log) = relay_with(Behavior::ReplyAfter("ок", Duration::from_millis(50)), 40);

    let r1 = Arc::clone(&relay);
    let r2 = Arc::clone(&relay);
    let (a, b) = tokio::join!(
        tokio::spawn(async move { r1.handle_inbound(ALLOWED, "один").await }),
        tokio::spawn(async move { r2.handle_inbound(ALLOWED, "два").await }),
    );
    assert_eq!(a.unwrap(), "ок");
    assert_eq!(b.unwrap(), "ок");

    // No lost update: both exchanges are recorded.
    assert_eq!(relay.store().transcript_len(ALLOWED).await, 4);

    // The second call saw the first exchange.
    let mut sizes: Vec<usize> = log.requests().iter().map(|r| r.messages.len()).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![1, 3]);
}

#[tokio::test]
async fn mode_switch_waits_for_in_flight_turn() {
    let (relay, _log) = relay_with(
        Behavior::ReplyAfter("Наушники Беспроводные", Duration::from_millis(50)),
        40,
    );

    let r1 = Arc::clone(&relay);
    let turn = tokio::spawn(async move { r1.handle_inbound(ALLOWED, "наушники").await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    relay.handle_inbound(ALLOWED, "profbs admin").await;

    // The in-flight turn finished in keyword mode.
    assert_eq!(turn.await.unwrap(), "наушники/беспроводные");
    assert_eq!(relay.store().mode(ALLOWED).await, ChatMode::Free);
}

#[tokio::test]
async fn relay_is_usable_through_the_handler_trait() {
    let (relay, log) = relay_with(Behavior::Reply("ок"), 40);
    let handler: Arc<dyn InboundHandler> = relay;

    assert_eq!(handler.handle_inbound(ChatId(9), "hi").await, ACCESS_DENIED);
    assert_eq!(handler.handle_inbound(ALLOWED, "hi").await, "ок");
    assert_eq!(log.calls(), 1);
}
