//! The blog app scenarios

use chrono::Datelike;

use crate::backend::User;
use crate::config::HarnessConfig;
use crate::error::E2eResult;
use crate::helpers::{
    blog_item, create_blog, expand_blog, expect_likes, like_plan, like_times, login, logout,
};
use crate::locator::Locator;
use crate::scenario::{Check, Scenario};
use crate::step::{Step, TextPattern};

/// Blogs created by the ordering scenario
pub const ORDERING_BLOGS: usize = 3;
pub const MIN_LIKES: u32 = 1;
pub const MAX_LIKES: u32 = 5;

/// Label the ordering scenario collects blog entries under
pub const BLOG_ENTRIES: &str = "blog_entries";

const TITLE: &str = "My New Book: Le Passager";
const AUTHOR: &str = "Jean-Christophe Grangé";
const URL: &str = "https://fr.wikipedia.org/wiki/Le_Passager_(roman)";

/// Every blog scenario, in run order. `seed` drives the like counts.
pub fn blog_suite(config: &HarnessConfig, seed: u64) -> E2eResult<Vec<Scenario>> {
    let ui = &config.selectors;
    let texts = &config.texts;
    let user = &config.seed_user;
    let year = chrono::Local::now().year();

    let logged_in = Step::expect_visible(Locator::text(&texts.logged_in_for(&user.name)));
    let blog_added = Step::expect_visible(Locator::text(&texts.blog_added_for(TITLE, AUTHOR)));

    let mut suite = vec![
        Scenario::builder("front_page_can_be_opened")
            .description("Heading and footer render on the front page")
            .tag("smoke")
            .step(Step::expect_visible(Locator::exact_text(&texts.heading)))
            .step(Step::expect_visible(Locator::text(&texts.footer_for(year))))
            .build(),
        Scenario::builder("login_form_can_be_opened")
            .tag("smoke")
            .tag("auth")
            .step(Step::click(Locator::button(&ui.login_button)))
            .step(Step::expect_visible(Locator::test_id(&ui.username_test_id)))
            .step(Step::expect_visible(Locator::test_id(&ui.password_test_id)))
            .build(),
        Scenario::builder("login_succeeds_with_correct_credentials")
            .tag("auth")
            .steps(login(ui, &user.username, &user.password))
            .step(logged_in.clone())
            .build(),
        Scenario::builder("login_fails_with_wrong_password")
            .description("Error is shown and no session is established")
            .tag("auth")
            .steps(login(ui, &user.username, &format!("{}-wrong", user.password)))
            .step(Step::expect_visible(Locator::text(&texts.login_error)))
            .step(Step::expect_hidden(Locator::text(&texts.logged_in_for(&user.name))))
            .build(),
        Scenario::builder("a_new_blog_can_be_created")
            .description("Confirmation names title and author; the new blog has no likes")
            .tag("blogs")
            .steps(login(ui, &user.username, &user.password))
            .step(logged_in.clone())
            .steps(create_blog(ui, TITLE, AUTHOR, URL))
            .step(blog_added.clone())
            .step(Step::ExpectContainsText {
                locator: blog_item(ui, TITLE),
                pattern: TextPattern::Literal(AUTHOR.to_string()),
            })
            .steps(expand_blog(ui, TITLE))
            .step(expect_likes(ui, texts, TITLE, 0))
            .build(),
        Scenario::builder("a_blog_can_be_liked")
            .tag("blogs")
            .steps(login(ui, &user.username, &user.password))
            .step(logged_in.clone())
            .steps(create_blog(ui, TITLE, AUTHOR, URL))
            .step(blog_added.clone())
            .steps(expand_blog(ui, TITLE))
            .steps(like_times(ui, texts, TITLE, 2))
            .build(),
        Scenario::builder("creator_can_delete_blog")
            .tag("blogs")
            .steps(login(ui, &user.username, &user.password))
            .step(logged_in.clone())
            .steps(create_blog(ui, TITLE, AUTHOR, URL))
            .step(blog_added.clone())
            .steps(expand_blog(ui, TITLE))
            .step(Step::click(
                blog_item(ui, TITLE).within(Locator::button(&ui.remove_button)),
            ))
            .step(Step::ExpectCount {
                locator: blog_item(ui, TITLE),
                count: 0,
            })
            .build(),
        only_creator_sees_remove(config),
        blogs_are_ordered_by_likes(config, seed)?,
    ];

    // Runs after scenarios that created blogs; an empty list proves the reset
    suite.push(
        Scenario::builder("reset_clears_previous_data")
            .tag("smoke")
            .step(Step::expect_visible(Locator::exact_text(&texts.heading)))
            .step(Step::ExpectCount {
                locator: Locator::test_id(&ui.blog_test_id),
                count: 0,
            })
            .step(Step::expect_hidden(Locator::text(TITLE)))
            .build(),
    );

    Ok(suite)
}

fn only_creator_sees_remove(config: &HarnessConfig) -> Scenario {
    let ui = &config.selectors;
    let texts = &config.texts;
    let creator = &config.seed_user;
    let other = User::new("Other Reader", "other-reader", "reader-secret");

    Scenario::builder("only_creator_sees_remove")
        .description("Another user sees the blog but not its remove control")
        .tag("blogs")
        .extra_user(other.clone())
        .steps(login(ui, &creator.username, &creator.password))
        .step(Step::expect_visible(Locator::text(&texts.logged_in_for(&creator.name))))
        .steps(create_blog(ui, TITLE, AUTHOR, URL))
        .step(Step::expect_visible(Locator::text(&texts.blog_added_for(TITLE, AUTHOR))))
        .steps(expand_blog(ui, TITLE))
        .step(Step::expect_visible(
            blog_item(ui, TITLE).within(Locator::button(&ui.remove_button)),
        ))
        .steps(logout(ui))
        .steps(login(ui, &other.username, &other.password))
        .step(Step::expect_visible(Locator::text(&texts.logged_in_for(&other.name))))
        .steps(expand_blog(ui, TITLE))
        .step(Step::expect_visible(
            blog_item(ui, TITLE).within(Locator::button(&ui.like_button)),
        ))
        .step(Step::expect_hidden(
            blog_item(ui, TITLE).within(Locator::button(&ui.remove_button)),
        ))
        .build()
}

fn blogs_are_ordered_by_likes(config: &HarnessConfig, seed: u64) -> E2eResult<Scenario> {
    let ui = &config.selectors;
    let texts = &config.texts;
    let user = &config.seed_user;
    let plan = like_plan(seed, ORDERING_BLOGS, MIN_LIKES, MAX_LIKES)?;

    let mut builder = Scenario::builder("blogs_are_ordered_by_likes")
        .description("After reload, blogs are listed by likes, most first")
        .tag("ordering")
        .step(Step::Log {
            message: format!("seed {} like plan {:?}", seed, plan),
        })
        .steps(login(ui, &user.username, &user.password))
        .step(Step::expect_visible(Locator::text(&texts.logged_in_for(&user.name))));

    let titles: Vec<String> = (1..=ORDERING_BLOGS).map(|i| format!("Ordering blog #{}", i)).collect();
    let author = "Sort Tester";

    for title in &titles {
        builder = builder
            .steps(create_blog(ui, title, author, "https://example.com/ordering"))
            .step(Step::expect_visible(Locator::text(&texts.blog_added_for(title, author))));
    }

    for (title, likes) in titles.iter().zip(&plan) {
        builder = builder
            .steps(expand_blog(ui, title))
            .steps(like_times(ui, texts, title, *likes));
    }

    let entries = Locator::test_id(&ui.blog_test_id);
    Ok(builder
        .step(Step::Reload)
        .step(Step::ExpectCount {
            locator: entries.clone(),
            count: ORDERING_BLOGS,
        })
        .step(Step::ClickUntilGone {
            locator: entries.clone().within(Locator::button(&ui.view_button)),
            max: ORDERING_BLOGS,
        })
        .step(Step::collect(BLOG_ENTRIES, entries))
        .check(Check::NonIncreasing {
            label: BLOG_ENTRIES.to_string(),
            pattern: texts.likes_pattern(),
        })
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UiSelectors;

    fn suite(seed: u64) -> Vec<Scenario> {
        blog_suite(&HarnessConfig::default(), seed).unwrap()
    }

    #[test]
    fn test_suite_names_unique() {
        let scenarios = suite(1);
        let mut names: Vec<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), scenarios.len());
        assert_eq!(scenarios.last().unwrap().name, "reset_clears_previous_data");
    }

    #[test]
    fn test_no_scenario_navigates_itself_first() {
        // The runner inserts goto:/ after reset and seed
        for scenario in suite(1) {
            assert!(!matches!(scenario.steps.first(), Some(Step::Goto { .. })), "{}", scenario.name);
        }
    }

    #[test]
    fn test_front_page_footer_has_current_year() {
        let scenarios = suite(1);
        let year = chrono::Local::now().year().to_string();
        let footer = &scenarios[0].steps[1];
        match footer {
            Step::ExpectVisible { locator } => assert!(locator.to_js().contains(&year)),
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_wrong_password_asserts_no_session() {
        let scenario = suite(1)
            .into_iter()
            .find(|s| s.name == "login_fails_with_wrong_password")
            .unwrap();
        assert_eq!(
            scenario.steps[2],
            Step::fill(Locator::test_id("password"), "123456-wrong")
        );
        assert_eq!(
            scenario.steps.last().unwrap(),
            &Step::expect_hidden(Locator::text("Berkan Sözer logged in"))
        );
    }

    #[test]
    fn test_new_blog_starts_at_zero_likes() {
        let scenario = suite(1)
            .into_iter()
            .find(|s| s.name == "a_new_blog_can_be_created")
            .unwrap();
        match scenario.steps.last().unwrap() {
            Step::ExpectContainsText { pattern: TextPattern::Regex(re), .. } => {
                assert!(re.contains("likes 0"))
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_new_blog_listed_with_author() {
        let scenario = suite(1)
            .into_iter()
            .find(|s| s.name == "a_new_blog_can_be_created")
            .unwrap();
        assert!(scenario.steps.contains(&Step::ExpectContainsText {
            locator: blog_item(&UiSelectors::default(), TITLE),
            pattern: TextPattern::Literal(AUTHOR.to_string()),
        }));
    }

    #[test]
    fn test_ordering_scenario_follows_seed() {
        let config = HarnessConfig::default();
        let plan = like_plan(77, ORDERING_BLOGS, MIN_LIKES, MAX_LIKES).unwrap();
        let scenario = blogs_are_ordered_by_likes(&config, 77).unwrap();

        let clicks = scenario
            .steps
            .iter()
            .filter(|s| matches!(s, Step::Click { locator } if locator.to_string().ends_with(r#"button "like""#)))
            .count();
        assert_eq!(clicks as u32, plan.iter().sum::<u32>());

        let reload = scenario.steps.iter().position(|s| *s == Step::Reload).unwrap();
        assert!(matches!(scenario.steps[reload + 1], Step::ExpectCount { count: ORDERING_BLOGS, .. }));
        assert!(matches!(scenario.steps.last(), Some(Step::Collect { .. })));
        assert_eq!(scenario.checks.len(), 1);
        assert_eq!(scenario.checks[0].label(), BLOG_ENTRIES);
    }

    #[test]
    fn test_only_creator_scenario_seeds_second_user() {
        let scenario = only_creator_sees_remove(&HarnessConfig::default());
        assert_eq!(scenario.extra_users.len(), 1);
        assert_ne!(scenario.extra_users[0].username, "berkan");
    }
}
