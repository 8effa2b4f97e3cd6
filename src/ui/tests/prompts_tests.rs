use super::*;

#[tokio::test]
async fn test_auto_yes_approves_without_prompting() {
    let ctx = UiContext::non_interactive().with_auto_yes(true);
    assert!(confirm(&ctx, "Replace out/?", false).await.unwrap());
}

#[tokio::test]
async fn test_non_interactive_returns_default() {
    let ctx = UiContext::non_interactive();
    assert!(!confirm(&ctx, "Replace out/?", false).await.unwrap());
    assert!(confirm(&ctx, "Replace out/?", true).await.unwrap());
}
