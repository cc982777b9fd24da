//! Lumberjack Client Demo
//!
//! Runs the full client pipeline against in-process collaborators: the
//! "program" is simulated by publishing the accounts it would write.

use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lumberjack::{
    accounts::tile::{Tile, BUILDING_TYPE_EMPTY, BUILDING_TYPE_SAWMILL},
    accounts::{ActionType, GameAction},
    session::memory::{MemoryAccountSource, RecordingSubmitter, StaticAvatarLookup},
    AccountRecord, BoardAccount, ClientConfig, GameActionHistory, LumberjackClient, PlayerData,
    Pubkey, SessionEvent, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Lumberjack client v{}", VERSION);

    let mut config = ClientConfig::from_env().context("loading configuration")?;
    if config.accounts.board.is_zero() {
        config.accounts.player = Pubkey::new([1; 32]);
        config.accounts.board = Pubkey::new([2; 32]);
        config.accounts.history = Pubkey::new([3; 32]);
        config.accounts.signer = Pubkey::new([4; 32]);
    }
    info!(
        policy = %config.rebuild_policy,
        program = %config.program_id.short(),
        "Configuration loaded"
    );

    demo(config).await
}

/// Play a short session: chop, build, collect.
async fn demo(config: ClientConfig) -> anyhow::Result<()> {
    info!("=== Starting Demo Session ===");
    let now = chrono::Utc::now().timestamp();
    let accounts = config.accounts;

    let source = MemoryAccountSource::new();
    let player = PlayerData {
        authority: accounts.signer,
        avatar: Pubkey::new([9; 32]),
        name: "Paul".to_string(),
        level: 1,
        xp: 0,
        energy: 2,
        last_login: now - 300,
    };
    info!(energy = player.energy, projected = player.projected_energy(now), "Player energy");

    let mut board = BoardAccount::default();
    let mut history = GameActionHistory::default();
    source.publish(accounts.player, &player.encode()?).await;
    source.publish(accounts.board, &board.encode()?).await;
    source.publish(accounts.history, &history.encode()?).await;

    let client = LumberjackClient::connect(
        config,
        &source,
        StaticAvatarLookup::failing(),
        RecordingSubmitter::new(),
    )
    .await
    .context("connecting client")?;

    let mut events = client.subscribe();
    let logger = tokio::spawn(async move {
        let mut count = 0usize;
        while let Ok(event) = events.recv().await {
            count += 1;
            match &event {
                SessionEvent::TileTransition(t) => {
                    info!(
                        action_id = t.action_id,
                        x = t.x,
                        y = t.y,
                        tile = %t.config.name,
                        change = ?t.change,
                        "Tile transition"
                    );
                }
                SessionEvent::RewardNotice(n) => {
                    info!(
                        amount = n.reward.amount,
                        resource = ?n.reward.resource,
                        by = %n.identity.name,
                        "Reward collected"
                    );
                }
                other => info!(event = other.kind(), "Session event"),
            }
        }
        count
    });

    let steps = [
        (client.chop_tree(4, 4).await?, ActionType::Chop, BUILDING_TYPE_EMPTY),
        (
            client.build(4, 4, BUILDING_TYPE_SAWMILL).await?,
            ActionType::Build,
            BUILDING_TYPE_SAWMILL,
        ),
        (client.collect(4, 4).await?, ActionType::Collect, BUILDING_TYPE_SAWMILL),
    ];

    // Simulate the program committing each transaction.
    for (signature, action_type, building_type) in steps {
        let tile = Tile {
            building_type,
            owner: accounts.signer,
            start_time: now,
            ..Tile::default()
        };
        let action_id = history.push(GameAction {
            action_type,
            x: 4,
            y: 4,
            tile,
            player: accounts.player,
            avatar: player.avatar,
            ..GameAction::default()
        });
        board.board[4][4] = tile;
        board.action_id = action_id;

        info!(%signature, action_id, "Committed");
        source.publish(accounts.history, &history.encode()?).await;
        source.publish(accounts.board, &board.encode()?).await;
    }

    tokio::time::sleep(Duration::from_millis(200)).await;
    let submitted = client.submitter().submitted().await.len();
    client.shutdown().await;

    let seen = logger.await.context("event logger")?;
    info!("=== Demo Complete ===");
    info!("Transactions submitted: {}", submitted);
    info!("Session events observed: {}", seen);
    Ok(())
}
