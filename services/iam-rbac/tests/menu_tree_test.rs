//! 菜单树：物化路径、移动、级联禁用与子树删除

mod common;

use atrium_errors::AppError;
use iam_rbac::application::menu::{MenuListing, MenuQuery, MenuSeed};
use iam_rbac::application::role::CreateRoleCommand;
use iam_rbac::domain::menu::{MenuStatus, MenuType};
use iam_rbac::domain::unit_of_work::Repositories;

use common::{harness, harness_with, menu_cmd};

#[tokio::test]
async fn test_menu_lifecycle_scenario() {
    let h = harness();

    let a = h.create_menu("a", None).await;
    let b = h.create_menu("b", Some(&a)).await;
    assert_eq!(a.parent_path, "");
    assert_eq!(b.parent_path, format!("{}.", a.id));

    let b = h.move_menu(&b, None).await.unwrap();
    assert_eq!(b.parent_path, "");
    assert_eq!(b.parent_id, None);

    let duplicate = h.ctx.menus.create(menu_cmd("a", None)).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let c = h.create_menu("c", Some(&a)).await;
    assert!(c.is_enabled());
    h.set_status(&a, MenuStatus::Disabled).await.unwrap();
    assert_eq!(h.reload(&c).await.unwrap().status, MenuStatus::Disabled);

    let role = h
        .ctx
        .roles
        .create(CreateRoleCommand {
            code: "viewer".to_string(),
            name: "Viewer".to_string(),
            menu_ids: vec![a.id, c.id, b.id],
            ..Default::default()
        })
        .await
        .unwrap();

    let removed = h.ctx.menus.delete(&a.id).await.unwrap();
    assert_eq!(removed.len(), 2);

    for menu in [&a, &c] {
        assert!(matches!(h.reload(menu).await, Err(AppError::NotFound(_))));
    }
    let resources = h
        .store
        .menu_resources()
        .list_by_menus(&[a.id, c.id])
        .await
        .unwrap();
    assert!(resources.is_empty());
    assert!(h.store.role_menus().list_by_target(&a.id).await.unwrap().is_empty());
    assert!(h.store.role_menus().list_by_target(&c.id).await.unwrap().is_empty());

    // B 不在被删子树内
    let detail = h.ctx.roles.get(&role.role.id).await.unwrap();
    assert_eq!(detail.menu_ids, vec![b.id]);
    assert!(h.reload(&b).await.is_ok());
}

#[tokio::test]
async fn test_moving_ancestor_rewrites_descendants() {
    let h = harness();

    let a = h.create_menu("a", None).await;
    let b = h.create_menu("b", Some(&a)).await;
    let c = h.create_menu("c", Some(&b)).await;
    let d = h.create_menu("d", Some(&c)).await;
    let target = h.create_menu("target", None).await;

    h.move_menu(&b, Some(&target)).await.unwrap();

    let b = h.reload(&b).await.unwrap();
    let c = h.reload(&c).await.unwrap();
    let d = h.reload(&d).await.unwrap();
    assert_eq!(b.parent_path, format!("{}.", target.id));
    assert_eq!(c.parent_path, format!("{}.{}.", target.id, b.id));
    assert_eq!(d.parent_path, format!("{}.{}.{}.", target.id, b.id, c.id));
    assert_eq!(h.reload(&a).await.unwrap().parent_path, "");
}

#[tokio::test]
async fn test_move_round_trip_restores_path() {
    let h = harness();

    let a = h.create_menu("a", None).await;
    let b = h.create_menu("b", Some(&a)).await;
    let c = h.create_menu("c", Some(&b)).await;
    let other = h.create_menu("other", None).await;
    let original_b = b.parent_path.clone();
    let original_c = c.parent_path.clone();

    h.move_menu(&b, Some(&other)).await.unwrap();
    h.move_menu(&b, Some(&a)).await.unwrap();

    assert_eq!(h.reload(&b).await.unwrap().parent_path, original_b);
    assert_eq!(h.reload(&c).await.unwrap().parent_path, original_c);
}

#[tokio::test]
async fn test_move_into_own_subtree_is_rejected() {
    let h = harness();

    let a = h.create_menu("a", None).await;
    let b = h.create_menu("b", Some(&a)).await;
    let c = h.create_menu("c", Some(&b)).await;

    assert!(matches!(h.move_menu(&a, Some(&c)).await, Err(AppError::Validation(_))));
    assert!(matches!(h.move_menu(&a, Some(&a)).await, Err(AppError::Validation(_))));

    // 失败后路径不变
    assert_eq!(h.reload(&c).await.unwrap().parent_path, format!("{}.{}.", a.id, b.id));
}

#[tokio::test]
async fn test_move_checks_sibling_code_under_new_parent() {
    let h = harness();

    let a = h.create_menu("a", None).await;
    let b = h.create_menu("b", None).await;
    h.create_menu("dup", Some(&a)).await;
    let dup = h.create_menu("dup", Some(&b)).await;

    assert!(matches!(h.move_menu(&dup, Some(&a)).await, Err(AppError::Conflict(_))));
    assert!(matches!(
        h.ctx.menus.create(menu_cmd("x", Some(iam_rbac::domain::menu::MenuId::new()))).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_disable_cascades_but_enable_does_not() {
    let h = harness();

    let a = h.create_menu("a", None).await;
    let b = h.create_menu("b", Some(&a)).await;
    let c = h.create_menu("c", Some(&b)).await;
    let d = h.create_menu("d", Some(&a)).await;

    h.set_status(&d, MenuStatus::Disabled).await.unwrap();
    h.set_status(&a, MenuStatus::Disabled).await.unwrap();
    for menu in [&b, &c, &d] {
        assert_eq!(h.reload(menu).await.unwrap().status, MenuStatus::Disabled);
    }

    h.set_status(&a, MenuStatus::Enabled).await.unwrap();
    assert!(h.reload(&a).await.unwrap().is_enabled());
    assert_eq!(h.reload(&d).await.unwrap().status, MenuStatus::Disabled);
}

#[tokio::test]
async fn test_deny_delete_is_policy_violation() {
    let h = harness_with(true);
    let a = h.create_menu("a", None).await;

    let result = h.ctx.menus.delete(&a.id).await;
    assert!(matches!(result, Err(AppError::PolicyViolation(_))));
    assert!(h.reload(&a).await.is_ok());
}

#[tokio::test]
async fn test_delete_missing_menu_is_not_found() {
    let h = harness();
    let result = h.ctx.menus.delete(&iam_rbac::domain::menu::MenuId::new()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_default_sequence_preserves_insert_order() {
    let h = harness();

    let first = h.create_menu("first", None).await;
    let second = h.create_menu("second", None).await;
    let third = h.create_menu("third", None).await;
    assert!(first.sequence > second.sequence);
    assert!(second.sequence > third.sequence);

    let listing = h
        .ctx
        .menus
        .query(&MenuQuery::default())
        .await
        .unwrap();
    let MenuListing::Flat(menus) = listing else {
        panic!("expected flat listing");
    };
    let codes: Vec<&str> = menus.iter().map(|m| m.code.as_str()).collect();
    assert_eq!(codes, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn test_query_as_tree_with_resources() {
    let h = harness();

    let a = h.create_menu("a", None).await;
    h.create_menu("b", Some(&a)).await;

    let listing = h
        .ctx
        .menus
        .query(&MenuQuery {
            as_tree: true,
            include_resources: true,
            ..Default::default()
        })
        .await
        .unwrap();
    let MenuListing::Tree(forest) = listing else {
        panic!("expected tree listing");
    };
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].children.len(), 1);
    assert_eq!(forest[0].menu.resources.len(), 1);
    assert_eq!(forest[0].count(), 2);
}

#[tokio::test]
async fn test_update_replaces_resources() {
    let h = harness();
    let a = h.create_menu("a", None).await;
    let original = a.resources[0].clone();

    let mut cmd = iam_rbac::application::menu::UpdateMenuCommand::from_menu(&a);
    cmd.resources = Some(vec![
        iam_rbac::domain::menu::ResourceSpec::new("get", "/api/a"),
        iam_rbac::domain::menu::ResourceSpec::new("POST", "/api/a"),
        iam_rbac::domain::menu::ResourceSpec::new("POST", "/api/a"),
    ]);
    let updated = h.ctx.menus.update(&a.id, cmd).await.unwrap();

    assert_eq!(updated.resources.len(), 2);
    assert!(updated.resources.iter().any(|r| r.id == original.id));

    // 不提交资源时保持不变
    let cmd = iam_rbac::application::menu::UpdateMenuCommand::from_menu(&updated);
    let kept = h.ctx.menus.update(&a.id, cmd).await.unwrap();
    assert_eq!(kept.resources.len(), 2);
}

#[tokio::test]
async fn test_import_seed_file_is_idempotent() {
    let h = harness();
    let seeds: Vec<MenuSeed> = serde_json::from_str(include_str!("../config/menu.json")).unwrap();

    let first = h.ctx.menus.import_seeds(seeds.clone()).await.unwrap();
    assert!(first.created > 0);
    assert_eq!(first.skipped, 0);
    assert!(first.resources_added > 0);

    let second = h.ctx.menus.import_seeds(seeds).await.unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.skipped, first.created);
    assert_eq!(second.resources_added, 0);

    let listing = h
        .ctx
        .menus
        .query(&MenuQuery {
            as_tree: true,
            ..Default::default()
        })
        .await
        .unwrap();
    let MenuListing::Tree(forest) = listing else {
        panic!("expected tree listing");
    };
    let roots: Vec<&str> = forest.iter().map(|n| n.menu.code.as_str()).collect();
    assert_eq!(roots, vec!["home", "system"]);

    let system = &forest[1];
    let buttons = &system.children[0].children;
    assert!(buttons.iter().all(|n| n.menu.menu_type == MenuType::Button));
    assert_eq!(system.count(), first.created - 1);
}

#[tokio::test]
async fn test_reimport_adds_missing_resources_to_existing_menu() {
    let h = harness();
    let seeds = |json: &str| -> Vec<MenuSeed> { serde_json::from_str(json).unwrap() };

    h.ctx
        .menus
        .import_seeds(seeds(
            r#"[{"code":"sys","name":"System","resources":[{"method":"GET","path":"/a"}]}]"#,
        ))
        .await
        .unwrap();

    let second = h
        .ctx
        .menus
        .import_seeds(seeds(
            r#"[{"code":"sys","name":"System","resources":[
                {"method":"get","path":"/a"},
                {"method":"POST","path":"/b"}
            ]}]"#,
        ))
        .await
        .unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(second.resources_added, 1);

    let sys = h.store.menus().find_by_code(None, "sys").await.unwrap().unwrap();
    let mut keys: Vec<(String, String)> = h
        .store
        .menu_resources()
        .list_by_menu(&sys.id)
        .await
        .unwrap()
        .iter()
        .map(|r| r.key())
        .collect();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            ("GET".to_string(), "/a".to_string()),
            ("POST".to_string(), "/b".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_invalid_seed_file_is_validation_error() {
    let h = harness();
    let dir = std::env::temp_dir().join(format!("iam-rbac-seed-{}", uuid::Uuid::now_v7()));
    std::fs::create_dir_all(&dir).unwrap();
    let file = dir.join("menu.json");
    std::fs::write(&file, "{ not json").unwrap();

    let result = h.ctx.menus.init_from_file(&file).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let missing = h.ctx.menus.init_from_file(dir.join("missing.json")).await;
    assert!(matches!(missing, Err(AppError::Validation(_))));
    std::fs::remove_dir_all(&dir).ok();
}
