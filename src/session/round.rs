use super::{GameSession, RoundState, SessionState};
use crate::error::{GameError, GameResult};
use crate::gateway::{into_content, parse_topics, ContentGateway, GatewayRequest};
use crate::pool::RefillRequest;
use crate::prompts::topics_prompt;
use crate::types::*;
use crate::{spice, turn};
use chrono::Utc;

/// Normalize a generated question for display: surrounding whitespace and
/// one pair of quotes removed, ending in exactly one `?`
pub fn format_question(raw: &str) -> String {
    let text = raw.trim();
    let text = text.strip_prefix(['"', '\'']).unwrap_or(text);
    let text = text.strip_suffix(['"', '\'']).unwrap_or(text);
    let text = text.strip_suffix('?').unwrap_or(text);
    format!("{}?", text)
}

impl SessionState {
    /// Claim the round for one gateway call. Returns the epoch to check on
    /// completion and the credential to send.
    fn begin_call(&mut self) -> GameResult<(u64, String)> {
        if self.in_flight {
            return Err(self.fail(GameError::RequestInFlight));
        }
        let Some(credential) = self.credential().map(str::to_string) else {
            let provider = self.provider;
            return Err(self.fail(GameError::MissingCredential(provider)));
        };

        self.in_flight = true;
        Ok((self.epoch, credential))
    }

    /// Release the round after a gateway call. Fails if the round was
    /// abandoned while the call was outstanding.
    fn finish_call(&mut self, epoch: u64) -> GameResult<()> {
        if self.epoch != epoch {
            tracing::warn!("Discarding gateway result for an abandoned round");
            return Err(GameError::RoundEnded);
        }
        self.in_flight = false;
        Ok(())
    }

    fn current_player_name(&self) -> String {
        self.round
            .current_player
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }
}

impl GameSession {
    /// Setup -> Selecting: validate the roster and credential, then pick the first player
    pub async fn start_game(&self) -> GameResult<Player> {
        let mut state = self.state.write().await;
        state.require_phase(GamePhase::Setup, "start the game")?;

        let players = state.roster.len();
        if players < 2 {
            return Err(state.fail(GameError::InsufficientRoster(players)));
        }
        if state.credential().is_none() {
            let provider = state.provider;
            return Err(state.fail(GameError::MissingCredential(provider)));
        }

        tracing::info!("Game {} started with {} players", self.id, players);
        state.rotation.reset();
        self.begin_round(&mut state)
    }

    /// QuestionReveal -> Selecting
    pub async fn next_round(&self) -> GameResult<Player> {
        let mut state = self.state.write().await;
        state.require_phase(GamePhase::QuestionReveal, "start the next round")?;
        self.begin_round(&mut state)
    }

    /// Pick the next player and fix the round's intensity
    fn begin_round(&self, state: &mut SessionState) -> GameResult<Player> {
        let picked = {
            let SessionState {
                roster,
                rotation,
                rng,
                spin,
                ..
            } = &mut *state;
            let picked = rotation.select_next(roster.as_slice(), rng);
            *spin = turn::spin_sequence(roster.as_slice(), self.config.spin_ticks, rng);
            picked
        };
        let Some(player) = picked else {
            return Err(state.fail(GameError::InsufficientRoster(0)));
        };

        let level = spice::resolve(state.preference, &mut state.rng);
        state.round = RoundState {
            current_player: Some(player.clone()),
            resolved_intensity: level,
        };
        state.round_no += 1;
        state.topics.clear();
        state.question = None;
        state.last_error = None;
        state.round_started_at = Some(Utc::now());
        state.phase = GamePhase::Selecting;

        tracing::info!(
            "Round {}: {} selected at {} intensity",
            state.round_no,
            player.name,
            level
        );
        Ok(player)
    }

    /// Selecting -> TopicChoice: ask the gateway for this round's topics.
    ///
    /// On failure the round stays in `Selecting` and may be retried.
    pub async fn fetch_topics(&self) -> GameResult<Vec<Topic>> {
        let (epoch, request) = {
            let mut state = self.state.write().await;
            state.require_phase(GamePhase::Selecting, "fetch topics")?;

            let player = state.current_player_name();
            let level = state.round.resolved_intensity;
            let (epoch, credential) = state.begin_call()?;

            tracing::info!("Requesting topics for {} at {} via {}", player, level, state.provider);
            let request = GatewayRequest {
                credential,
                prompt: topics_prompt(&player, level, self.config.topic_count),
                expects_plain_text: false,
                provider: state.provider,
            };
            (epoch, request)
        };

        let response = self.gateway.generate(request).await;
        let result = into_content(response).and_then(|content| parse_topics(&content));

        let mut state = self.state.write().await;
        state.finish_call(epoch)?;
        match result {
            Ok(mut topics) => {
                topics.truncate(self.config.topic_count);
                state.topics = topics.clone();
                state.phase = GamePhase::TopicChoice;
                state.last_error = None;
                Ok(topics)
            }
            Err(e) => Err(state.fail(e)),
        }
    }

    /// TopicChoice -> QuestionReveal: serve a question for the chosen topic.
    ///
    /// The raw question is recorded in the session log before formatting. On
    /// failure the round stays in `TopicChoice` and may be retried.
    pub async fn choose_topic(&self, index: usize) -> GameResult<String> {
        let (epoch, topic, player, level, credential, provider) = {
            let mut state = self.state.write().await;
            state.require_phase(GamePhase::TopicChoice, "choose a topic")?;

            let Some(topic) = state.topics.get(index).cloned() else {
                return Err(state.fail(GameError::TopicNotOffered(index)));
            };
            let (epoch, credential) = state.begin_call()?;
            tracing::info!("Topic chosen: {}", topic.title);

            (
                epoch,
                topic,
                state.current_player_name(),
                state.round.resolved_intensity,
                credential,
                state.provider,
            )
        };

        let result = async {
            let recently_used = self.log.all().await?;
            let question = self
                .pool
                .pop_or_refill(RefillRequest {
                    topic: &topic,
                    level,
                    player: &player,
                    recently_used: &recently_used,
                    credential: &credential,
                    provider,
                })
                .await?;
            self.log.record(&question).await?;
            Ok::<_, GameError>(question)
        }
        .await;

        let mut state = self.state.write().await;
        state.finish_call(epoch)?;
        match result {
            Ok(raw) => {
                let question = format_question(&raw);
                state.question = Some(question.clone());
                state.phase = GamePhase::QuestionReveal;
                state.last_error = None;
                Ok(question)
            }
            Err(e) => Err(state.fail(e)),
        }
    }

    /// Any phase -> Setup. Clears the rotation and current player; the
    /// question pools and session log are kept. An outstanding gateway call
    /// is not cancelled, its result is discarded.
    pub async fn end_game(&self) {
        let mut state = self.state.write().await;
        if state.in_flight {
            tracing::warn!("Game ended with a gateway call in flight");
        }

        state.phase = GamePhase::Setup;
        state.rotation.reset();
        state.round.current_player = None;
        state.round_no = 0;
        state.topics.clear();
        state.question = None;
        state.spin.clear();
        state.in_flight = false;
        state.epoch += 1;
        state.last_error = None;
        state.round_started_at = None;

        tracing::info!("Game {} ended", self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayResponse, ScriptedGateway};
    use crate::store::MemoryStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    const TOPICS: &str = r#"[
        {"title": "Desires", "description": "What you want"},
        {"title": "Wild Stories", "description": "Party tales"},
        {"title": "Hot Takes", "description": "Opinions"}
    ]"#;

    fn session_with(gateway: Arc<ScriptedGateway>, seed: u64) -> GameSession {
        GameSession::with_rng(
            GameConfig::default(),
            gateway,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            StdRng::seed_from_u64(seed),
        )
    }

    async fn ready_session(names: &[&str], responses: Vec<GatewayResponse>) -> (GameSession, Arc<ScriptedGateway>) {
        let gateway = Arc::new(ScriptedGateway::new(responses));
        let session = session_with(gateway.clone(), 42);
        for name in names {
            session.add_player(name).await.unwrap();
        }
        session.set_credential("test-key").await;
        (session, gateway)
    }

    async fn wait_for_calls(gateway: &ScriptedGateway, n: usize) {
        while gateway.calls().await < n {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_format_question() {
        assert_eq!(format_question("  \"What is your secret?\"  "), "What is your secret?");
        assert_eq!(format_question("'Ever lied to a friend'"), "Ever lied to a friend?");
        assert_eq!(format_question("Really??"), "Really??");
        assert_eq!(format_question("No mark"), "No mark?");
        assert_eq!(format_question(""), "?");
    }

    #[tokio::test]
    async fn test_start_requires_two_players() {
        let (session, _) = ready_session(&["Al"], vec![]).await;

        let err = session.start_game().await.unwrap_err();
        assert_eq!(err, GameError::InsufficientRoster(1));

        let view = session.view().await;
        assert_eq!(view.phase, GamePhase::Setup);
        assert!(view.last_error.is_some());
    }

    #[tokio::test]
    async fn test_start_requires_credential() {
        let gateway = Arc::new(ScriptedGateway::new(vec![]));
        let session = session_with(gateway, 1);
        session.add_player("Al").await.unwrap();
        session.add_player("Bo").await.unwrap();

        let err = session.start_game().await.unwrap_err();
        assert_eq!(err, GameError::MissingCredential(Provider::Google));
        assert_eq!(session.view().await.phase, GamePhase::Setup);
    }

    #[tokio::test]
    async fn test_two_players_alternate_at_fixed_intensity() {
        let (session, _) = ready_session(
            &["Al", "Bo"],
            vec![GatewayResponse::ok(TOPICS), GatewayResponse::ok(r#"["Q1","Q2"]"#)],
        )
        .await;

        let first = session.start_game().await.unwrap();
        let view = session.view().await;
        assert_eq!(view.round.resolved_intensity, IntensityLevel::Mild);
        assert_eq!(view.used_players, vec![first.name.clone()]);
        assert_eq!(view.spin.len(), 21);

        session.fetch_topics().await.unwrap();
        session.choose_topic(0).await.unwrap();

        let second = session.next_round().await.unwrap();
        assert_ne!(first.name, second.name);
        assert_eq!(session.view().await.round_no, 2);
    }

    #[tokio::test]
    async fn test_rotation_covers_roster_before_repeating() {
        let (session, _) = ready_session(&["Al", "Bo", "Cy"], vec![]).await;

        let mut picks = vec![session.start_game().await.unwrap().name];
        for _ in 0..2 {
            session.state.write().await.phase = GamePhase::QuestionReveal;
            picks.push(session.next_round().await.unwrap().name);
        }
        picks.sort();
        assert_eq!(picks, vec!["Al", "Bo", "Cy"]);

        session.state.write().await.phase = GamePhase::QuestionReveal;
        let fourth = session.next_round().await.unwrap();
        assert_eq!(session.view().await.used_players, vec![fourth.name]);
    }

    #[tokio::test]
    async fn test_full_round_reveals_formatted_question() {
        let (session, gateway) = ready_session(
            &["Al", "Bo"],
            vec![
                GatewayResponse::ok(format!("```json\n{}\n```", TOPICS)),
                GatewayResponse::ok(r#"["'Ever lied to a friend'", "Q2?"]"#),
            ],
        )
        .await;
        let player = session.start_game().await.unwrap();

        let topics = session.fetch_topics().await.unwrap();
        assert_eq!(topics.len(), 3);
        assert_eq!(session.view().await.phase, GamePhase::TopicChoice);

        let question = session.choose_topic(0).await.unwrap();
        assert_eq!(question, "Ever lied to a friend?");

        let view = session.view().await;
        assert_eq!(view.phase, GamePhase::QuestionReveal);
        assert_eq!(view.question.as_deref(), Some("Ever lied to a friend?"));

        assert_eq!(session.log().all().await.unwrap(), vec!["'Ever lied to a friend'"]);
        assert_eq!(
            session.pool().peek("desires", IntensityLevel::Mild).await.unwrap(),
            vec!["Q2?"]
        );

        let requests = gateway.requests().await;
        assert!(!requests[0].expects_plain_text);
        assert!(requests[0].prompt.contains(&player.name));
        assert!(requests[1].expects_plain_text);
        assert_eq!(requests[1].credential, "test-key");
    }

    #[tokio::test]
    async fn test_topic_failure_stays_in_selecting() {
        let (session, _) = ready_session(
            &["Al", "Bo"],
            vec![GatewayResponse::failed("rate limited"), GatewayResponse::ok(TOPICS)],
        )
        .await;
        session.start_game().await.unwrap();

        let err = session.fetch_topics().await.unwrap_err();
        assert_eq!(err, GameError::GatewayFailure("rate limited".to_string()));
        let view = session.view().await;
        assert_eq!(view.phase, GamePhase::Selecting);
        assert!(view.last_error.unwrap().contains("rate limited"));
        assert!(!view.in_flight);

        session.fetch_topics().await.unwrap();
        let view = session.view().await;
        assert_eq!(view.phase, GamePhase::TopicChoice);
        assert!(view.last_error.is_none());
    }

    #[tokio::test]
    async fn test_question_failure_stays_in_topic_choice() {
        let (session, _) = ready_session(
            &["Al", "Bo"],
            vec![
                GatewayResponse::ok(TOPICS),
                GatewayResponse::ok("not json"),
                GatewayResponse::ok("[]"),
            ],
        )
        .await;
        session.start_game().await.unwrap();
        session.fetch_topics().await.unwrap();

        let err = session.choose_topic(1).await.unwrap_err();
        assert!(matches!(err, GameError::ResponseFormat { .. }));
        assert_eq!(session.view().await.phase, GamePhase::TopicChoice);

        let err = session.choose_topic(1).await.unwrap_err();
        assert_eq!(err, GameError::Exhausted);
        assert_eq!(session.view().await.phase, GamePhase::TopicChoice);
        assert!(session.log().all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_choose_unknown_topic() {
        let (session, gateway) = ready_session(&["Al", "Bo"], vec![GatewayResponse::ok(TOPICS)]).await;
        session.start_game().await.unwrap();
        session.fetch_topics().await.unwrap();

        assert_eq!(session.choose_topic(3).await.unwrap_err(), GameError::TopicNotOffered(3));
        assert_eq!(gateway.calls().await, 1);
    }

    #[tokio::test]
    async fn test_transitions_out_of_order_are_rejected() {
        let (session, _) = ready_session(&["Al", "Bo"], vec![]).await;

        assert!(matches!(
            session.fetch_topics().await.unwrap_err(),
            GameError::InvalidTransition { phase: GamePhase::Setup, .. }
        ));
        assert!(matches!(
            session.next_round().await.unwrap_err(),
            GameError::InvalidTransition { .. }
        ));

        session.start_game().await.unwrap();
        assert!(matches!(
            session.start_game().await.unwrap_err(),
            GameError::InvalidTransition { phase: GamePhase::Selecting, .. }
        ));
        assert!(matches!(
            session.choose_topic(0).await.unwrap_err(),
            GameError::InvalidTransition { .. }
        ));
    }

    #[tokio::test]
    async fn test_random_intensity_is_fixed_for_the_round() {
        let (session, gateway) = ready_session(
            &["Al", "Bo"],
            vec![GatewayResponse::ok(TOPICS), GatewayResponse::ok(r#"["Q1"]"#)],
        )
        .await;
        session.set_preference(IntensityPreference::Random).await;
        session.start_game().await.unwrap();
        let level = session.view().await.round.resolved_intensity;

        session.set_preference(IntensityPreference::Intimate).await;
        session.fetch_topics().await.unwrap();
        session.choose_topic(0).await.unwrap();

        assert_eq!(session.view().await.round.resolved_intensity, level);
        let marker = format!("Spice Level: {}", level.as_str().to_uppercase());
        for request in gateway.requests().await {
            assert!(request.prompt.contains(&marker));
        }
        assert_eq!(
            session.pool().peek("Desires", level).await.unwrap(),
            Vec::<String>::new()
        );

        session.next_round().await.unwrap();
        assert_eq!(
            session.view().await.round.resolved_intensity,
            IntensityLevel::Intimate
        );
    }

    #[tokio::test]
    async fn test_second_call_rejected_while_in_flight() {
        let gateway = Arc::new(ScriptedGateway::gated(vec![GatewayResponse::ok(TOPICS)]));
        let session = session_with(gateway.clone(), 3);
        session.add_player("Al").await.unwrap();
        session.add_player("Bo").await.unwrap();
        session.set_credential("key").await;
        session.start_game().await.unwrap();

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.fetch_topics().await }
        });
        wait_for_calls(&gateway, 1).await;

        assert!(session.view().await.in_flight);
        assert_eq!(session.fetch_topics().await.unwrap_err(), GameError::RequestInFlight);
        assert_eq!(gateway.calls().await, 1);

        gateway.release(1);
        assert_eq!(task.await.unwrap().unwrap().len(), 3);
        assert!(!session.view().await.in_flight);
    }

    #[tokio::test]
    async fn test_result_discarded_after_game_ends() {
        let gateway = Arc::new(ScriptedGateway::gated(vec![GatewayResponse::ok(TOPICS)]));
        let session = session_with(gateway.clone(), 3);
        session.add_player("Al").await.unwrap();
        session.add_player("Bo").await.unwrap();
        session.set_credential("key").await;
        session.start_game().await.unwrap();

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.fetch_topics().await }
        });
        wait_for_calls(&gateway, 1).await;

        session.end_game().await;
        gateway.release(1);
        assert_eq!(task.await.unwrap().unwrap_err(), GameError::RoundEnded);

        let view = session.view().await;
        assert_eq!(view.phase, GamePhase::Setup);
        assert!(view.topics.is_empty());
        assert!(!view.in_flight);
    }

    #[tokio::test]
    async fn test_question_discarded_after_game_ends() {
        let gateway = Arc::new(ScriptedGateway::gated(vec![
            GatewayResponse::ok(TOPICS),
            GatewayResponse::ok(r#"["Q1","Q2","Q3"]"#),
        ]));
        let session = session_with(gateway.clone(), 3);
        session.add_player("Al").await.unwrap();
        session.add_player("Bo").await.unwrap();
        session.set_credential("key").await;
        session.start_game().await.unwrap();
        let level = session.view().await.round.resolved_intensity;

        gateway.release(1);
        session.fetch_topics().await.unwrap();

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.choose_topic(0).await }
        });
        wait_for_calls(&gateway, 2).await;

        session.end_game().await;
        gateway.release(1);
        assert_eq!(task.await.unwrap().unwrap_err(), GameError::RoundEnded);

        let view = session.view().await;
        assert_eq!(view.phase, GamePhase::Setup);
        assert!(view.question.is_none());
        assert!(!view.in_flight);

        // The pop and the log write already happened
        assert_eq!(session.log().all().await.unwrap(), vec!["Q1"]);
        assert_eq!(
            session.pool().peek("Desires", level).await.unwrap(),
            vec!["Q2".to_string(), "Q3".to_string()]
        );
    }

    #[tokio::test]
    async fn test_end_game_keeps_pool_and_log() {
        let (session, _) = ready_session(
            &["Al", "Bo"],
            vec![GatewayResponse::ok(TOPICS), GatewayResponse::ok(r#"["Q1","Q2","Q3"]"#)],
        )
        .await;
        session.start_game().await.unwrap();
        session.fetch_topics().await.unwrap();
        session.choose_topic(2).await.unwrap();

        session.end_game().await;

        let view = session.view().await;
        assert_eq!(view.phase, GamePhase::Setup);
        assert!(view.round.current_player.is_none());
        assert!(view.used_players.is_empty());
        assert!(view.question.is_none());
        assert_eq!(view.roster.len(), 2);

        assert_eq!(session.log().all().await.unwrap(), vec!["Q1"]);
        assert_eq!(
            session.pool().peek("Hot Takes", IntensityLevel::Mild).await.unwrap(),
            vec!["Q2", "Q3"]
        );
    }
}
