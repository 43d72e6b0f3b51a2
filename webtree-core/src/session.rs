// Round driver: question, two answers, a verdict, then a move in the tree

use crate::collaborators::{
    GeneratedTask, Judge, Judgement, LoserFailure, QuestionGenerator, QuestionRequest,
    ResearchAgent, Side, TieQuality, Verdict,
};
use crate::error::Result;
use crate::navigation::{ExpansionKind, Focus, NavigationController};
use crate::question_log::QuestionLog;
use serde::Serialize;
use tracing::{error, info, warn};
use webtree_scanner::PageFetcher;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_rounds: usize,
    /// Consecutive content-less pools tolerated before a round is given up.
    pub max_skips: usize,
    pub question_log: Option<QuestionLog>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_rounds: 10,
            max_skips: 5,
            question_log: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundRecord {
    pub round_id: usize,
    pub question: String,
    pub verdict: Verdict,
    pub loser_failure: LoserFailure,
    pub tie_quality: Option<TieQuality>,
    pub depth_level: usize,
    pub width: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSummary {
    pub rounds: usize,
    pub records: Vec<RoundRecord>,
    pub skipped_rounds: usize,
    pub generation_failures: usize,
    pub judge_errors: usize,
}

pub struct EvolutionSession<F: PageFetcher> {
    controller: NavigationController<F>,
    generator: Box<dyn QuestionGenerator>,
    agent_a: Box<dyn ResearchAgent>,
    agent_b: Box<dyn ResearchAgent>,
    judge: Box<dyn Judge>,
    config: SessionConfig,
    past_questions: Vec<String>,
}

impl<F: PageFetcher> EvolutionSession<F> {
    pub fn new(
        controller: NavigationController<F>,
        generator: Box<dyn QuestionGenerator>,
        agent_a: Box<dyn ResearchAgent>,
        agent_b: Box<dyn ResearchAgent>,
        judge: Box<dyn Judge>,
    ) -> Self {
        Self {
            controller,
            generator,
            agent_a,
            agent_b,
            judge,
            config: SessionConfig::default(),
            past_questions: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn controller(&self) -> &NavigationController<F> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut NavigationController<F> {
        &mut self.controller
    }

    pub fn past_questions(&self) -> &[String] {
        &self.past_questions
    }

    /// Play up to `max_rounds` rounds from a random starting node.
    ///
    /// Only persistence failures end the session early.
    pub fn run(&mut self) -> Result<SessionSummary> {
        self.controller.jump_to_random_start();
        let root_topic = self.controller.root_topic();
        info!("Overall topic: {}", root_topic);

        let mut summary = SessionSummary::default();
        let mut round = 0;
        let mut skips = 0;

        while round < self.config.max_rounds {
            round += 1;
            let depth_level = self.controller.depth_level();
            info!("=== ROUND {} ===", round);
            info!(
                "Depth: {} | Width constraint: {}",
                depth_level,
                self.controller.difficulty_nodes()
            );
            info!("Logic chain: {}", self.controller.chain_titles().join(" -> "));

            self.controller.ensure_min_width()?;
            let context = self.controller.get_context_nodes();

            if !context.has_target_content() {
                if skips < self.config.max_skips {
                    skips += 1;
                    warn!("Target pool is title-only or empty, expanding width and re-jumping");
                    self.controller.auto_expand_tree(ExpansionKind::InsufficientWidth, 1)?;
                    self.controller.jump_to_random_start();
                    round -= 1;
                    continue;
                }
                warn!("No answerable pool after {} attempts, skipping round {}", skips, round);
                skips = 0;
                summary.skipped_rounds += 1;
                self.controller.jump_to_random_start();
                continue;
            }
            skips = 0;

            let request = QuestionRequest {
                reasoning_chain_fmt: context.reasoning_chain_fmt,
                aggregation_pool_fmt: context.aggregation_pool_fmt,
                depth_level,
                width_count: self.controller.difficulty_nodes(),
                past_questions: self.past_questions.clone(),
                root_topic: root_topic.clone(),
            };

            let task = match self.generator.generate(&request) {
                Ok(task) => task,
                Err(e) => {
                    error!("Question generation failed: {}. Skipping round", e);
                    summary.generation_failures += 1;
                    self.controller.jump_to_random_start();
                    continue;
                }
            };

            if let Some(log) = &self.config.question_log
                && let Err(e) = log.append(&task, round, depth_level, request.width_count, &root_topic)
            {
                error!("Failed to save question to {}: {}", log.path().display(), e);
            }
            self.past_questions.push(task.question.clone());

            let answer_a = self.research(Side::A, &task);
            let answer_b = self.research(Side::B, &task);

            let judgement = self.judge.judge(&task, &answer_a, &answer_b);
            info!("Verdict: {}", judgement.verdict);
            if judgement.verdict == Verdict::Error {
                error!("Judge verdict could not be parsed, skipping navigation");
                summary.judge_errors += 1;
                continue;
            }

            summary.records.push(RoundRecord {
                round_id: round,
                question: task.question.clone(),
                verdict: judgement.verdict,
                loser_failure: judgement.loser_failure,
                tie_quality: judgement.tie_quality,
                depth_level,
                width: request.width_count,
            });

            self.apply_judgement(&judgement)?;
        }

        summary.rounds = round;
        info!("Session finished after {} rounds", round);
        Ok(summary)
    }

    /// Ask one agent; failures become the answer text.
    fn research(&mut self, side: Side, task: &GeneratedTask) -> String {
        let (agent, history) = match side {
            Side::A => (&mut self.agent_a, &mut self.controller.transcripts_mut().a),
            Side::B => (&mut self.agent_b, &mut self.controller.transcripts_mut().b),
        };

        match agent.research(&task.question, &task.word_limit_instruction, history.as_slice()) {
            Ok(outcome) => {
                info!("Agent {:?} answered in {:.1}s", side, outcome.elapsed.as_secs_f64());
                history.extend(outcome.messages);
                outcome.final_answer
            }
            Err(e) => {
                warn!("Agent {:?} failed: {}", side, e);
                e.to_string()
            }
        }
    }

    /// Move in the tree according to how the round went.
    pub fn apply_judgement(&mut self, judgement: &Judgement) -> Result<()> {
        let nav = &mut self.controller;

        match judgement.verdict.winner() {
            None if judgement.tie_quality == Some(TieQuality::Low) => {
                warn!("Tie with weak answers, backtracking");
                if !nav.backtrack() {
                    nav.reset_difficulty();
                    nav.set_focus(Focus::Width);
                }
            }
            None => {
                info!("Tie with strong answers, deeper and wider");
                nav.raise_difficulty();
                let moved = nav.advance_tree()?;
                nav.set_focus(if moved { Focus::Depth } else { Focus::Width });
            }
            Some(winner) => {
                info!("Winner is {:?}, loser failure {:?}", winner, judgement.loser_failure);
                match judgement.loser_failure {
                    LoserFailure::Deep => {
                        if nav.advance_tree()? {
                            nav.set_focus(Focus::Depth);
                        } else {
                            nav.set_focus(Focus::Width);
                            nav.raise_difficulty();
                        }
                    }
                    LoserFailure::Wide => {
                        nav.raise_difficulty();
                        nav.set_focus(Focus::Width);
                    }
                    LoserFailure::Both | LoserFailure::None => {
                        nav.raise_difficulty();
                        let moved = nav.advance_tree()?;
                        nav.set_focus(if moved { Focus::Depth } else { Focus::Width });
                    }
                }
            }
        }
        Ok(())
    }
}
