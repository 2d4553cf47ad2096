//! greatdori 剧情终端

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{env, fs, io};

use anyhow::Context;
use greatdori_story::config::PlayerConfig;
use greatdori_story::constant::PLAYER_CONFIG;
use greatdori_story::models::Presentation;
use greatdori_story::player::*;
use tokio::io::{AsyncBufReadExt, BufReader};

/// 基本输入
macro_rules! input {
    () => {{
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        line.trim().to_string()
    }};
    ($prompt:literal) => {{
        print!($prompt);
        flush!();
        input!()
    }};
}

macro_rules! flush {
    () => {
        io::stdout().flush()?
    };
}

const HELP: &str = "<enter> next | a auto play | f fast forward | b backlog | q quit";

/// 把画面变化打印到终端
struct Renderer {
    last: Presentation,
}

impl Renderer {
    fn new() -> Self {
        Self {
            last: Presentation::default(),
        }
    }

    fn show(&mut self, state: Presentation) {
        let last = &self.last;

        if state.background != last.background
            && let Some(background) = &state.background
        {
            println!("[background] {background}");
        }
        if state.bgm != last.bgm
            && let Some(bgm) = &state.bgm
        {
            println!("[bgm] {bgm}");
        }
        if state.layouts != last.layouts {
            let stage: Vec<_> = state
                .layouts
                .iter()
                .map(|layout| format!("{}@{}", layout.character_id, layout.position))
                .collect();
            println!("[stage] {}", stage.join(", "));
        }
        if state.black_cover.visible != last.black_cover.visible {
            println!("[black cover] {}", state.black_cover.visible);
        }
        if state.white_cover.visible != last.white_cover.visible {
            println!("[white cover] {}", state.white_cover.visible);
        }
        if state.telop != last.telop
            && let Some(telop) = &state.telop
        {
            println!("\n  == {telop} ==\n");
        }
        if state.talk != last.talk
            && let Some(talk) = &state.talk
        {
            println!("\n{}: {}", talk.character_names.join(" & "), talk.text);
        }

        self.last = state;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    println!("story-cli\n");
    println!("current dir: {}\n", env::current_dir()?.display());

    let story: PathBuf = input!("story file: ").into();
    let voice_root = input!("voice root (empty to skip): ");

    let config = PlayerConfig::load_or_default(Path::new(PLAYER_CONFIG));
    let bytes = fs::read(&story).with_context(|| format!("read {}", story.display()))?;
    let actions = load_story(&bytes, &BestdoriLoader::from_config(&config))?;

    let voices = Arc::new(VoiceCache::new());
    if !voice_root.is_empty() {
        let count = voices
            .prefetch(&actions, &FsVoiceFetcher::new(&voice_root))
            .await;
        println!("prefetched {count} voices");
        voices
            .take_error()
            .iter()
            .for_each(|err| println!("  {err}"));
    }

    let mut player = DefaultPlayer::new(actions, config, Arc::new(NullAudio), voices);
    let mut renderer = Renderer::new();
    let mut changes = player.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("\n{HELP}\n");
    player.start()?;

    loop {
        tokio::select! {
            status = player.finished() => {
                println!("\n{status}");
                break;
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = changes.borrow_and_update().clone();
                renderer.show(state);
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match line.trim() {
                    "" => {
                        player.next();
                    }
                    "a" => {
                        player.set_auto_play(!player.is_auto_play());
                        println!("auto play: {}", player.is_auto_play());
                    }
                    "f" => {
                        player.set_fast_forward(!player.is_fast_forward());
                        println!("fast forward: {}", player.is_fast_forward());
                    }
                    "b" => player
                        .backlog()
                        .iter()
                        .enumerate()
                        .for_each(|(id, talk)| println!("  {id}. {}", talk.text)),
                    "q" => break,
                    _ => println!("{HELP}"),
                }
            }
        }
    }

    player.stop();
    Ok(())
}
