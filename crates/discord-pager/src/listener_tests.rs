//! Session loop tests against the in-memory surface.
//!
//! All tests run on a paused clock, so deadlines and edit latency are
//! simulated without real waiting.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::config::PaginatorConfig;
    use crate::error::{PagerError, SurfaceError};
    use crate::listener::{Paginated, Pager, SessionEnd, SessionReport};
    use crate::mock::{MockSurface, SurfaceCall};
    use crate::session::SYMBOLS;
    use crate::surface::{ArtifactRef, ChannelPermissions, ReactionEvent};

    const CHANNEL: u64 = 100;
    const OWNER: u64 = 7;

    /// Page size 14 (16 minus "[" and "]").
    fn config(concurrency: usize) -> PaginatorConfig {
        PaginatorConfig {
            max_size: 16,
            max_pages: 10,
            by_lines: false,
            prefix: "[".to_string(),
            suffix: "]".to_string(),
            timeout_secs: 60,
            concurrency,
        }
    }

    fn seven_pages() -> String {
        "a".repeat(14 * 7)
    }

    fn pager(surface: &MockSurface, concurrency: usize) -> Pager<MockSurface> {
        Pager::new(Arc::new(surface.clone()), config(concurrency))
    }

    fn react(surface: &MockSurface, artifact: ArtifactRef, symbol: &str) -> usize {
        surface.emit(ReactionEvent {
            emitter_id: OWNER,
            artifact,
            symbol: symbol.to_string(),
        })
    }

    async fn start(pager: &Pager<MockSurface>) -> (ArtifactRef, tokio::task::JoinHandle<SessionReport>) {
        match pager.paginate(CHANNEL, OWNER, &seven_pages()).await.unwrap() {
            Paginated::Interactive { artifact, handle } => (artifact, handle),
            Paginated::Single(_) => panic!("expected an interactive session"),
        }
    }

    fn is_clear(call: &SurfaceCall) -> bool {
        matches!(call, SurfaceCall::ClearReactions { .. })
    }

    fn is_remove(call: &SurfaceCall) -> bool {
        matches!(call, SurfaceCall::RemoveReaction { .. })
    }

    // ── session start ────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_single_page_gets_no_reactions_and_no_subscription() {
        let surface = MockSurface::new();
        let result = pager(&surface, 2).paginate(CHANNEL, OWNER, "short").await.unwrap();

        assert!(matches!(result, Paginated::Single(_)));
        assert_eq!(
            surface.calls(),
            vec![SurfaceCall::Create {
                channel_id: CHANNEL,
                body: "[short\n\nPage 1 / 1]".to_string(),
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_interactive_session_sends_first_page_and_all_symbols() {
        let surface = MockSurface::new();
        let (_artifact, handle) = start(&pager(&surface, 2)).await;

        let calls = surface.calls();
        assert_eq!(
            calls[0],
            SurfaceCall::Create {
                channel_id: CHANNEL,
                body: format!("[{}\n\nPage 1 / 7]", "a".repeat(14)),
            }
        );
        assert!(matches!(calls[1], SurfaceCall::Subscribe { .. }));
        assert_eq!(surface.reactions_added(), SYMBOLS.to_vec());

        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_config_fails_before_sending() {
        let surface = MockSurface::new();
        let pager = Pager::new(
            Arc::new(surface.clone()),
            PaginatorConfig {
                max_size: 2,
                ..config(2)
            },
        );

        let err = pager.paginate(CHANNEL, OWNER, "text").await.unwrap_err();
        assert!(matches!(err, PagerError::InvalidArgument(_)));
        assert!(surface.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_permission_denied_is_reported_and_nothing_starts() {
        let surface = MockSurface::new();
        surface.fail_create(SurfaceError::permission_denied("Missing Permissions"));

        let err = pager(&surface, 2)
            .paginate(CHANNEL, OWNER, &seven_pages())
            .await
            .unwrap_err();
        assert!(matches!(err, PagerError::PermissionDenied(_)));
        assert!(surface.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_add_reactions_permission() {
        let surface = MockSurface::new();
        surface.set_permissions(ChannelPermissions {
            add_reactions: false,
            manage_messages: true,
            direct_message: false,
        });

        let err = pager(&surface, 2)
            .paginate(CHANNEL, OWNER, &seven_pages())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to react to message - Missing ADD_REACTIONS permission"
        );
        assert!(surface.reactions_added().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_manage_messages_permission_in_guild() {
        let surface = MockSurface::new();
        surface.set_permissions(ChannelPermissions {
            add_reactions: true,
            manage_messages: false,
            direct_message: false,
        });

        let err = pager(&surface, 2)
            .paginate(CHANNEL, OWNER, &seven_pages())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to react to message - Missing MANAGE_MESSAGES permission"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_manage_messages_not_needed_in_direct_messages() {
        let surface = MockSurface::new();
        surface.set_permissions(ChannelPermissions {
            add_reactions: true,
            manage_messages: false,
            direct_message: true,
        });

        let (_artifact, handle) = start(&pager(&surface, 2)).await;
        assert_eq!(handle.await.unwrap().end, SessionEnd::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_reaction_permission_denied_is_fatal() {
        let surface = MockSurface::new();
        surface.fail_add_reaction(SurfaceError::permission_denied("Missing Permissions"));

        let err = pager(&surface, 2)
            .paginate(CHANNEL, OWNER, &seven_pages())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to react to message - Missing Permissions"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_add_reaction_failure_is_not_fatal() {
        let surface = MockSurface::new();
        surface.fail_add_reaction(SurfaceError::transient("connection reset"));

        let (_artifact, handle) = start(&pager(&surface, 2)).await;
        assert_eq!(handle.await.unwrap().end, SessionEnd::TimedOut);
    }

    // ── endings ──────────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_timeout_without_events_clears_reactions() {
        let surface = MockSurface::new();
        let started = tokio::time::Instant::now();
        let (_artifact, handle) = start(&pager(&surface, 2)).await;

        let report = handle.await.unwrap();
        assert_eq!(report.end, SessionEnd::TimedOut);
        assert_eq!(report.transitions, 0);
        assert_eq!(report.renders, 0);
        assert!(surface.edits().is_empty());
        assert_eq!(surface.count(is_clear), 1);
        assert!(started.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_is_absolute_not_reset_by_events() {
        let surface = MockSurface::new();
        let started = tokio::time::Instant::now();
        let (artifact, handle) = start(&pager(&surface, 2)).await;

        tokio::time::sleep(Duration::from_secs(40)).await;
        react(&surface, artifact, "▶");

        let report = handle.await.unwrap();
        assert_eq!(report.end, SessionEnd::TimedOut);
        assert_eq!(report.transitions, 1);
        assert!(started.elapsed() < Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_session_and_clears_reactions() {
        let surface = MockSurface::new();
        let (artifact, handle) = start(&pager(&surface, 2)).await;

        react(&surface, artifact, "⏹");

        let report = handle.await.unwrap();
        assert_eq!(report.end, SessionEnd::Stopped);
        assert!(surface.edits().is_empty());
        assert_eq!(surface.count(is_clear), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_clear_does_not_change_the_ending() {
        let surface = MockSurface::new();
        surface.fail_clear(SurfaceError::permission_denied("Missing Permissions"));
        let (artifact, handle) = start(&pager(&surface, 2)).await;

        react(&surface, artifact, "⏹");

        assert_eq!(handle.await.unwrap().end, SessionEnd::Stopped);
        assert_eq!(surface.count(is_clear), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_closure_ends_silently() {
        let surface = MockSurface::new();
        let (_artifact, handle) = start(&pager(&surface, 2)).await;

        surface.close();

        let report = handle.await.unwrap();
        assert_eq!(report.end, SessionEnd::Closed);
        assert_eq!(surface.count(is_clear), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleted_message_ends_session() {
        let surface = MockSurface::new();
        surface.fail_edits(Some(SurfaceError::not_found("Unknown Message")));
        let (artifact, handle) = start(&pager(&surface, 2)).await;

        react(&surface, artifact, "▶");

        let report = handle.await.unwrap();
        assert_eq!(report.end, SessionEnd::ArtifactGone);
        assert_eq!(surface.count(is_clear), 0);
    }

    // ── navigation ───────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_next_renders_second_page_and_removes_the_reaction() {
        let surface = MockSurface::new();
        let (artifact, handle) = start(&pager(&surface, 2)).await;

        react(&surface, artifact, "▶");
        react(&surface, artifact, "⏹");

        let report = handle.await.unwrap();
        assert_eq!(report.end, SessionEnd::Stopped);
        assert_eq!(report.transitions, 1);
        assert_eq!(report.renders, 1);
        assert_eq!(
            surface.edits(),
            vec![format!("[{}\n\nPage 2 / 7]", "a".repeat(14))]
        );
        assert!(surface.calls().contains(&SurfaceCall::RemoveReaction {
            artifact,
            symbol: "▶".to_string(),
            emitter_id: OWNER,
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_then_first() {
        let surface = MockSurface::new();
        let (artifact, handle) = start(&pager(&surface, 2)).await;

        react(&surface, artifact, "⏭");
        tokio::time::sleep(Duration::from_millis(1)).await;
        react(&surface, artifact, "⏮");
        tokio::time::sleep(Duration::from_millis(1)).await;
        react(&surface, artifact, "⏹");

        handle.await.unwrap();
        let edits = surface.edits();
        assert_eq!(edits.len(), 2);
        assert!(edits[0].ends_with("Page 7 / 7]"));
        assert!(edits[1].ends_with("Page 1 / 7]"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_previous_on_first_page_only_removes_the_reaction() {
        let surface = MockSurface::new();
        let (artifact, handle) = start(&pager(&surface, 2)).await;

        react(&surface, artifact, "◀");
        react(&surface, artifact, "⏹");

        let report = handle.await.unwrap();
        assert_eq!(report.transitions, 0);
        assert!(surface.edits().is_empty());
        assert_eq!(surface.count(is_remove), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reactions_from_other_users_never_reach_the_session() {
        let surface = MockSurface::new();
        let (artifact, handle) = start(&pager(&surface, 2)).await;

        let delivered = surface.emit(ReactionEvent {
            emitter_id: OWNER + 1,
            artifact,
            symbol: "▶".to_string(),
        });
        assert_eq!(delivered, 0);
        assert_eq!(react(&surface, artifact, "👍"), 0);

        let report = handle.await.unwrap();
        assert_eq!(report.transitions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_edit_failure_keeps_session_alive() {
        let surface = MockSurface::new();
        surface.fail_edits(Some(SurfaceError::transient("502 Bad Gateway")));
        let (artifact, handle) = start(&pager(&surface, 2)).await;

        react(&surface, artifact, "▶");
        tokio::time::sleep(Duration::from_millis(1)).await;
        surface.fail_edits(None);
        react(&surface, artifact, "▶");
        react(&surface, artifact, "⏹");

        let report = handle.await.unwrap();
        assert_eq!(report.end, SessionEnd::Stopped);
        assert_eq!(report.transitions, 2);
        assert_eq!(report.renders, 1);
        assert_eq!(surface.edits().len(), 1);
        assert!(surface.edits()[0].ends_with("Page 3 / 7]"));
    }

    // ── render gate ──────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_burst_under_saturated_gate_renders_the_final_page() {
        let surface = MockSurface::new();
        surface.set_edit_delay(Duration::from_millis(100));
        let (artifact, handle) = start(&pager(&surface, 1)).await;

        for _ in 0..5 {
            react(&surface, artifact, "▶");
        }

        let report = handle.await.unwrap();
        assert_eq!(report.end, SessionEnd::TimedOut);
        assert_eq!(report.transitions, 5);
        assert_eq!(report.dropped_renders, 4);

        let edits = surface.edits();
        assert!(edits.len() <= 2, "intermediate pages coalesce: {:?}", edits);
        assert!(edits.last().unwrap().ends_with("Page 6 / 7]"));
        // Every triggering reaction is still taken back off.
        assert_eq!(surface.count(is_remove), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_flushes_the_latest_dropped_render_before_clearing() {
        let surface = MockSurface::new();
        surface.set_edit_delay(Duration::from_millis(100));
        let (artifact, handle) = start(&pager(&surface, 1)).await;

        react(&surface, artifact, "▶");
        react(&surface, artifact, "▶");
        react(&surface, artifact, "▶");
        react(&surface, artifact, "⏹");

        let report = handle.await.unwrap();
        assert_eq!(report.end, SessionEnd::Stopped);

        let calls = surface.calls();
        let last_edit = calls
            .iter()
            .rposition(|c| matches!(c, SurfaceCall::Edit { .. }))
            .unwrap();
        let clear = calls.iter().position(is_clear).unwrap();
        assert!(last_edit < clear);
        assert!(surface.edits().last().unwrap().ends_with("Page 4 / 7]"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wide_gate_renders_every_page() {
        let surface = MockSurface::new();
        surface.set_edit_delay(Duration::from_millis(100));
        let (artifact, handle) = start(&pager(&surface, 5)).await;

        for _ in 0..3 {
            react(&surface, artifact, "▶");
        }

        let report = handle.await.unwrap();
        assert_eq!(report.dropped_renders, 0);
        assert!(report.renders >= 3);
        // Completion order is not fixed; a stale landing is repainted.
        assert!(surface.edits().last().unwrap().ends_with("Page 4 / 7]"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_render_landing_last_is_repainted() {
        let surface = MockSurface::new();
        surface.set_edit_delays([Duration::from_millis(500)]);
        surface.set_edit_delay(Duration::from_millis(10));
        let (artifact, handle) = start(&pager(&surface, 2)).await;

        react(&surface, artifact, "▶");
        react(&surface, artifact, "▶");

        let report = handle.await.unwrap();
        assert_eq!(report.dropped_renders, 0);
        assert_eq!(report.renders, 3);

        let tails: Vec<String> = surface
            .edits()
            .iter()
            .map(|body| body.rsplit("\n\n").next().unwrap().to_string())
            .collect();
        assert_eq!(tails, vec!["Page 3 / 7]", "Page 2 / 7]", "Page 3 / 7]"]);
    }

    // ── bookkeeping ──────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_active_sessions_are_counted() {
        let surface = MockSurface::new();
        let pager = pager(&surface, 2);
        let (artifact, handle) = start(&pager).await;
        assert_eq!(pager.active_sessions(), 1);

        react(&surface, artifact, "⏹");
        handle.await.unwrap();
        assert_eq!(pager.active_sessions(), 0);
    }
}
