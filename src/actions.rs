use log::{debug, info};
use std::fmt;
use std::time::Duration;

use crate::assets::PatternSet;
use crate::config::BotConfig;
use crate::error::BotResult;
use crate::input::{ClickOptions, Pointer, move_and_click};
use crate::poller::{PollOutcome, Poller};
use crate::screen::ScreenCapturer;

pub const HOME_BEFORE: &str = "home-before";
pub const HOME_AFTER: &str = "home-after";
pub const SKIP_PLAY: &str = "skip-play";
pub const MENU: &str = "menu";
pub const SKIP_SCENE: &str = "skip-scene";
pub const DIALOG_SKIP: &str = "dialog-skip";
pub const GACHA: &str = "gacha";
pub const GACHA_FREE: &str = "gacha-free";
pub const GACHA_CONFIRM: &str = "gacha-confirm";
pub const ADVENTURE: &str = "adventure";
pub const ADVENTURE_EXPLORE: &str = "adventure-explore";
pub const ADVENTURE_CONFIRM: &str = "adventure-confirm";
pub const DUNGEON: &str = "dungeon";
pub const DUNGEON_ENTER: &str = "dungeon-enter";
pub const DUNGEON_START: &str = "dungeon-start";

/// Every pattern the built-in actions look for.
pub const PATTERN_NAMES: &[&str] = &[
    HOME_BEFORE,
    HOME_AFTER,
    SKIP_PLAY,
    MENU,
    SKIP_SCENE,
    DIALOG_SKIP,
    GACHA,
    GACHA_FREE,
    GACHA_CONFIRM,
    ADVENTURE,
    ADVENTURE_EXPLORE,
    ADVENTURE_CONFIRM,
    DUNGEON,
    DUNGEON_ENTER,
    DUNGEON_START,
];

/// How long to look for the highlighted home tab once the plain one is gone.
const HOME_CONFIRM_TIMEOUT: Duration = Duration::from_secs(1);
/// Result screens animate in before their buttons accept clicks.
const SETTLE_DELAY: Duration = Duration::from_millis(500);
/// Time for the next screen to start its transition after a click.
const TRANSITION_DELAY: Duration = Duration::from_secs(1);

/// One wait-then-click of a script.
#[derive(Debug, Clone, Copy)]
pub struct Step {
    pub pattern: &'static str,
    /// `None` uses the configured default.
    pub timeout: Option<Duration>,
    /// A missing required pattern fails the whole action.
    pub required: bool,
    pub options: ClickOptions,
}

impl Step {
    pub const fn required(pattern: &'static str) -> Self {
        Self {
            pattern,
            timeout: None,
            required: true,
            options: ClickOptions {
                click: true,
                pre_click_delay: Duration::ZERO,
                post_click_delay: Duration::ZERO,
            },
        }
    }

    pub const fn optional(pattern: &'static str) -> Self {
        Self {
            required: false,
            ..Self::required(pattern)
        }
    }

    pub const fn settle_first(self) -> Self {
        Self {
            options: ClickOptions {
                pre_click_delay: SETTLE_DELAY,
                ..self.options
            },
            ..self
        }
    }

    pub const fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..self
        }
    }

    pub const fn then_wait(self) -> Self {
        Self {
            options: ClickOptions {
                post_click_delay: TRANSITION_DELAY,
                ..self.options
            },
            ..self
        }
    }
}

const HOME_STEP: Step = Step::required(HOME_BEFORE);
// Only looked for, never clicked.
const HOME_CONFIRM_STEP: Step = Step::optional(HOME_AFTER).with_timeout(HOME_CONFIRM_TIMEOUT);

// Each step is confirmed by the next one finding its button.
const SKIP_SCENE_STEPS: &[Step] = &[
    Step::optional(MENU),
    Step::optional(SKIP_SCENE),
    Step::optional(DIALOG_SKIP),
];

const GACHA_STEPS: &[Step] = &[
    Step::required(GACHA).then_wait(),
    Step::required(GACHA_FREE).settle_first(),
    Step::required(GACHA_CONFIRM).then_wait(),
    Step::optional(SKIP_PLAY),
];

const ADVENTURE_STEPS: &[Step] = &[
    Step::required(ADVENTURE).then_wait(),
    Step::required(ADVENTURE_EXPLORE).settle_first(),
    Step::required(ADVENTURE_CONFIRM),
];

const DUNGEON_STEPS: &[Step] = &[
    Step::required(DUNGEON).then_wait(),
    Step::required(DUNGEON_ENTER).settle_first(),
    Step::required(DUNGEON_START).then_wait(),
    Step::optional(SKIP_PLAY),
];

/// The named actions that can be run from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Home,
    Skip,
    SkipScene,
    Gacha,
    Adventure,
    Dungeon,
    Daily,
}

impl Action {
    /// Patterns to load before the action starts.
    pub fn patterns(&self) -> Vec<&'static str> {
        let steps = |steps: &[Step]| steps.iter().map(|step| step.pattern).collect::<Vec<_>>();
        match self {
            Action::Home => vec![HOME_BEFORE, HOME_AFTER],
            Action::Skip => vec![SKIP_PLAY],
            Action::SkipScene => steps(SKIP_SCENE_STEPS),
            Action::Gacha => steps(GACHA_STEPS),
            Action::Adventure => steps(ADVENTURE_STEPS),
            Action::Dungeon => steps(DUNGEON_STEPS),
            Action::Daily => [Action::Home, Action::Gacha, Action::Adventure, Action::Dungeon]
                .iter()
                .flat_map(Action::patterns)
                .collect(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Home => "go home",
            Action::Skip => "click skip button",
            Action::SkipScene => "skip scene",
            Action::Gacha => "claim daily gacha",
            Action::Adventure => "explore adventure",
            Action::Dungeon => "run dungeon",
            Action::Daily => "daily routine",
        };
        f.write_str(name)
    }
}

/// Where `navigate_home` left the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeScreen {
    Navigated,
    AlreadyThere,
    NotFound,
}

/// Drives the game through fixed wait-and-click scripts.
pub struct Bot<S, P> {
    screen: S,
    pointer: P,
    patterns: PatternSet,
    poller: Poller,
    threshold: f32,
}

impl<S: ScreenCapturer, P: Pointer> Bot<S, P> {
    pub fn new(screen: S, pointer: P, patterns: PatternSet, config: &BotConfig) -> Self {
        Self {
            screen,
            pointer,
            patterns,
            poller: Poller::new(config.timeout(), config.poll_interval()),
            threshold: config.threshold,
        }
    }

    pub fn pointer(&self) -> &P {
        &self.pointer
    }

    pub fn default_timeout(&self) -> Duration {
        self.poller.timeout()
    }

    /// Polls for `name` for up to `timeout`.
    pub fn wait_for(&mut self, name: &str, timeout: Duration) -> BotResult<PollOutcome> {
        let pattern = self.patterns.get(name)?;
        self.poller
            .with_timeout(timeout)
            .wait_until(&mut self.screen, pattern, self.threshold)
    }

    /// Polls for `step.pattern` with the step's own timeout, if it has one.
    pub fn find(&mut self, step: &Step) -> BotResult<PollOutcome> {
        let timeout = step.timeout.unwrap_or(self.poller.timeout());
        self.wait_for(step.pattern, timeout)
    }

    /// Moves to the centre of the first match and applies `options` there.
    pub fn press(&mut self, outcome: &PollOutcome, options: ClickOptions) -> BotResult<bool> {
        let Some(center) = outcome.result.center() else {
            return Ok(false);
        };
        move_and_click(&mut self.pointer, center, options)?;
        Ok(true)
    }

    /// Waits for `step.pattern` and clicks it. False if it never showed up.
    pub fn tap(&mut self, step: &Step) -> BotResult<bool> {
        let outcome = self.find(step)?;
        debug!(
            "[{}] {} after {} attempt(s) in {:?}",
            step.pattern,
            if outcome.found() { "found" } else { "missing" },
            outcome.attempts,
            outcome.elapsed
        );
        self.press(&outcome, step.options)
    }

    /// Runs `steps` in order, giving up at the first missing required step.
    pub fn run_steps(&mut self, action: Action, steps: &[Step]) -> BotResult<bool> {
        info!("---- Running '{}'", action);
        for step in steps {
            let clicked = self.tap(step)?;
            if clicked {
                info!("---- Clicked [{}]", step.pattern);
            } else if step.required {
                info!("---- '{}' stopped: [{}] not found", action, step.pattern);
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn run(&mut self, action: Action) -> BotResult<bool> {
        match action {
            Action::Home => self.go_home(),
            Action::Skip => self.click_skip_button(),
            Action::SkipScene => self.skip_scene(),
            Action::Gacha => self.claim_daily_gacha(),
            Action::Adventure => self.explore_adventure(),
            Action::Dungeon => self.run_dungeon(),
            Action::Daily => self.daily(),
        }
    }

    pub fn navigate_home(&mut self) -> BotResult<HomeScreen> {
        info!("---- Running '{}'", Action::Home);
        if self.tap(&HOME_STEP)? {
            return Ok(HomeScreen::Navigated);
        }
        if self.find(&HOME_CONFIRM_STEP)?.found() {
            info!("---- Already on the home screen");
            Ok(HomeScreen::AlreadyThere)
        } else {
            info!("---- No home button on this screen");
            Ok(HomeScreen::NotFound)
        }
    }

    /// True only when the home button was clicked; already being home counts
    /// as false.
    pub fn go_home(&mut self) -> BotResult<bool> {
        Ok(self.navigate_home()? == HomeScreen::Navigated)
    }

    pub fn click_skip_button(&mut self) -> BotResult<bool> {
        self.run_steps(Action::Skip, &[Step::required(SKIP_PLAY)])
    }

    /// Every step is optional, so this always reports success.
    pub fn skip_scene(&mut self) -> BotResult<bool> {
        self.run_steps(Action::SkipScene, SKIP_SCENE_STEPS)
    }

    pub fn claim_daily_gacha(&mut self) -> BotResult<bool> {
        self.run_steps(Action::Gacha, GACHA_STEPS)
    }

    pub fn explore_adventure(&mut self) -> BotResult<bool> {
        self.run_steps(Action::Adventure, ADVENTURE_STEPS)
    }

    pub fn run_dungeon(&mut self) -> BotResult<bool> {
        self.run_steps(Action::Dungeon, DUNGEON_STEPS)
    }

    /// Home, gacha, adventure, dungeon. Stops at the first action that fails.
    pub fn daily(&mut self) -> BotResult<bool> {
        info!("---- Running '{}'", Action::Daily);
        if self.navigate_home()? == HomeScreen::NotFound {
            return Ok(false);
        }
        for action in [Action::Gacha, Action::Adventure, Action::Dungeon] {
            if !self.run(action)? {
                info!("---- '{}' stopped after '{}' failed", Action::Daily, action);
                return Ok(false);
            }
            if self.navigate_home()? == HomeScreen::NotFound {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
