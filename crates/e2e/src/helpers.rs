//! Reusable UI procedures shared by scenarios.
//!
//! Helpers only drive the UI. Asserting the outcome is left to the caller,
//! so `login` serves both the success and the wrong-password scenario.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{UiSelectors, UiTexts};
use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::step::{Step, TextPattern};

/// Open the login form, fill both fields and submit
pub fn login(ui: &UiSelectors, username: &str, password: &str) -> Vec<Step> {
    vec![
        Step::click(Locator::button(&ui.login_button)),
        Step::fill(Locator::test_id(&ui.username_test_id), username),
        Step::fill(Locator::test_id(&ui.password_test_id), password),
        Step::click(Locator::button(&ui.login_button)),
    ]
}

pub fn logout(ui: &UiSelectors) -> Vec<Step> {
    vec![Step::click(Locator::button(&ui.logout_button))]
}

/// Open the creation form and submit it.
///
/// Values go in verbatim; trailing whitespace and newlines are the
/// application's business.
pub fn create_blog(ui: &UiSelectors, title: &str, author: &str, url: &str) -> Vec<Step> {
    vec![
        Step::click(Locator::button(&ui.new_blog_button)),
        Step::fill(Locator::test_id(&ui.title_test_id), title),
        Step::fill(Locator::test_id(&ui.author_test_id), author),
        Step::fill(Locator::test_id(&ui.url_test_id), url),
        Step::click(Locator::button(&ui.create_button)),
    ]
}

/// The list entry for the blog titled `title`
pub fn blog_item(ui: &UiSelectors, title: &str) -> Locator {
    Locator::test_id(&ui.blog_test_id).filter_has_text(title)
}

/// Show the detail view of one blog
pub fn expand_blog(ui: &UiSelectors, title: &str) -> Vec<Step> {
    vec![Step::click(blog_item(ui, title).within(Locator::button(&ui.view_button)))]
}

/// Wait until the blog shows exactly `n` likes
pub fn expect_likes(ui: &UiSelectors, texts: &UiTexts, title: &str, n: u32) -> Step {
    Step::ExpectContainsText {
        locator: blog_item(ui, title),
        pattern: TextPattern::Regex(format!(
            r"(?:^|\D){}(?:\D|$)",
            regex::escape(&texts.likes_for(n))
        )),
    }
}

/// Click like `n` times on an expanded blog.
///
/// Each click waits for the counter to show the new value before the next
/// one, so clicks never race on the shared counter.
pub fn like_times(ui: &UiSelectors, texts: &UiTexts, title: &str, n: u32) -> Vec<Step> {
    let like = blog_item(ui, title).within(Locator::button(&ui.like_button));
    (1..=n)
        .flat_map(|k| [Step::click(like.clone()), expect_likes(ui, texts, title, k)])
        .collect()
}

/// Uniform integer over the inclusive range `[min, max]`
pub fn random_int<R: Rng>(rng: &mut R, min: i64, max: i64) -> E2eResult<i64> {
    if min > max {
        return Err(E2eError::Config(format!("empty range [{}, {}]", min, max)));
    }
    Ok(rng.gen_range(min..=max))
}

/// Nonzero like counts for `count` blogs, reproducible from `seed`
pub fn like_plan(seed: u64, count: usize, min: u32, max: u32) -> E2eResult<Vec<u32>> {
    if min == 0 {
        return Err(E2eError::Config("like counts must be nonzero".to_string()));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| random_int(&mut rng, min.into(), max.into()).map(|n| n as u32))
        .collect()
}
