//! 端到端流程：菜单 → 权限 → 角色 → 用户 → 登录 → 可见菜单 → 登出

mod common;

use atrium_auth_core::Subject;
use atrium_common::Pagination;
use atrium_errors::AppError;
use iam_rbac::application::permission::{CreatePermissionCommand, UpdatePermissionCommand};
use iam_rbac::application::role::{CreateRoleCommand, UpdateRoleCommand};
use iam_rbac::application::user::{CreateUserCommand, UpdateUserCommand};
use iam_rbac::domain::menu::MenuId;
use iam_rbac::domain::permission::PermissionFilter;
use iam_rbac::domain::role::{RoleFilter, RoleStatus};
use iam_rbac::domain::user::{UserFilter, UserStatus};

use common::{Harness, ROOT_PASSWORD, ROOT_USERNAME, harness};

fn user_cmd(username: &str, role_ids: Vec<iam_rbac::domain::role::RoleId>) -> CreateUserCommand {
    CreateUserCommand {
        username: username.to_string(),
        email: format!("{}@example.com", username),
        full_name: username.to_uppercase(),
        password: "secret-1".to_string(),
        role_ids,
        ..Default::default()
    }
}

async fn role_with_menus(h: &Harness, code: &str, menu_ids: Vec<MenuId>) -> iam_rbac::domain::role::RoleId {
    h.ctx
        .roles
        .create(CreateRoleCommand {
            code: code.to_string(),
            name: code.to_string(),
            menu_ids,
            ..Default::default()
        })
        .await
        .unwrap()
        .role
        .id
}

#[tokio::test]
async fn test_login_and_visible_menus() {
    let h = harness();

    let system = h.create_menu("system", None).await;
    let users = h.create_menu("users", Some(&system)).await;
    let add = h.create_menu("add", Some(&users)).await;
    let hidden = h.create_menu("hidden", None).await;

    // 只授权叶子节点，祖先自动补齐
    let role = role_with_menus(&h, "operator", vec![add.id]).await;
    h.ctx.users.create(user_cmd("alice", vec![role])).await.unwrap();

    let token = h.ctx.auth.login("alice", "secret-1").await.unwrap();
    assert_eq!(token.token_type, "Bearer");

    let ctx = h.ctx.auth.authenticate(&token.access_token).await.unwrap();
    assert_eq!(ctx.role_ids, vec![role]);

    let forest = h.ctx.auth.current_menus(&ctx.subject).await.unwrap();
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].menu.id, system.id);
    assert!(forest[0].find(&add.id).is_some());
    assert!(forest.iter().all(|n| n.find(&hidden.id).is_none()));

    let root_forest = h.ctx.auth.current_menus(&Subject::Root).await.unwrap();
    assert_eq!(root_forest.len(), 2);

    h.ctx.auth.logout(&token.access_token).await.unwrap();
    assert!(matches!(
        h.ctx.auth.authenticate(&token.access_token).await,
        Err(AppError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_disabled_branch_and_role_are_hidden() {
    let h = harness();

    let system = h.create_menu("system", None).await;
    let users = h.create_menu("users", Some(&system)).await;
    let role = role_with_menus(&h, "operator", vec![system.id, users.id]).await;
    let user = h.ctx.users.create(user_cmd("alice", vec![role])).await.unwrap();
    let subject = Subject::User(user.user.id);

    assert_eq!(h.ctx.auth.current_menus(&subject).await.unwrap().len(), 1);

    h.set_status(&system, iam_rbac::domain::menu::MenuStatus::Disabled)
        .await
        .unwrap();
    assert!(h.ctx.auth.current_menus(&subject).await.unwrap().is_empty());

    h.set_status(&system, iam_rbac::domain::menu::MenuStatus::Enabled)
        .await
        .unwrap();
    let forest = h.ctx.auth.current_menus(&subject).await.unwrap();
    assert_eq!(forest.len(), 1);
    // 子节点保持级联后的禁用状态
    assert!(forest[0].children.is_empty());

    let detail = h.ctx.roles.get(&role).await.unwrap();
    h.ctx
        .roles
        .update(
            &role,
            UpdateRoleCommand {
                code: detail.role.code.clone(),
                name: detail.role.name.clone(),
                description: String::new(),
                sequence: 0,
                status: RoleStatus::Disabled,
                menu_ids: detail.menu_ids.clone(),
                permission_ids: vec![],
            },
        )
        .await
        .unwrap();
    assert!(h.ctx.auth.current_menus(&subject).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_root_login_and_current_user() {
    let h = harness();

    let token = h.ctx.auth.login(ROOT_USERNAME, ROOT_PASSWORD).await.unwrap();
    let ctx = h.ctx.auth.authenticate(&token.access_token).await.unwrap();
    assert!(ctx.is_root());

    let current = h.ctx.auth.current_user(&ctx.subject).await.unwrap();
    assert_eq!(current.username, ROOT_USERNAME);

    let refreshed = h.ctx.auth.refresh_token(&ctx.subject).await.unwrap();
    assert!(h.ctx.auth.authenticate(&refreshed.access_token).await.unwrap().is_root());
}

#[tokio::test]
async fn test_login_failures_are_uniform() {
    let h = harness();
    let user = h.ctx.users.create(user_cmd("alice", vec![])).await.unwrap();

    let wrong_password = h.ctx.auth.login("alice", "wrong-pass").await.unwrap_err();
    let unknown = h.ctx.auth.login("nobody", "secret-1").await.unwrap_err();
    assert_eq!(wrong_password.to_string(), unknown.to_string());

    h.ctx
        .users
        .update_status(&user.user.id, UserStatus::Inactive)
        .await
        .unwrap();
    let inactive = h.ctx.auth.login("alice", "secret-1").await.unwrap_err();
    assert_eq!(inactive.to_string(), unknown.to_string());
    assert!(matches!(
        h.ctx.auth.refresh_token(&Subject::User(user.user.id)).await,
        Err(AppError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_user_password_change() {
    let h = harness();
    let user = h.ctx.users.create(user_cmd("alice", vec![])).await.unwrap();

    h.ctx
        .users
        .update(
            &user.user.id,
            UpdateUserCommand {
                username: "alice".to_string(),
                password: Some("changed-1".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(h.ctx.auth.login("alice", "secret-1").await.is_err());
    assert!(h.ctx.auth.login("alice", "changed-1").await.is_ok());
}

#[tokio::test]
async fn test_username_rules() {
    let h = harness();
    h.ctx.users.create(user_cmd("alice", vec![])).await.unwrap();

    assert!(matches!(
        h.ctx.users.create(user_cmd("alice", vec![])).await,
        Err(AppError::Conflict(_))
    ));
    assert!(matches!(
        h.ctx.users.create(user_cmd(ROOT_USERNAME, vec![])).await,
        Err(AppError::Conflict(_))
    ));
    assert!(matches!(
        h.ctx
            .users
            .create(user_cmd("bob", vec![iam_rbac::domain::role::RoleId::new()]))
            .await,
        Err(AppError::NotFound(_))
    ));
    // 失败的创建不留下数据
    let page = h
        .ctx
        .users
        .query(&UserFilter::default(), &Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn test_role_delete_invalidates_affected_users() {
    let h = harness();
    let menu = h.create_menu("system", None).await;
    let role = role_with_menus(&h, "operator", vec![menu.id]).await;
    let user = h.ctx.users.create(user_cmd("alice", vec![role])).await.unwrap();
    let subject = Subject::User(user.user.id);

    assert_eq!(h.ctx.sessions.resolve(&subject).await.unwrap().role_ids, vec![role]);

    h.ctx.roles.delete(&role).await.unwrap();

    assert!(h.ctx.sessions.resolve(&subject).await.unwrap().role_ids.is_empty());
    assert!(h.ctx.users.get(&user.user.id).await.unwrap().role_ids.is_empty());
    assert!(matches!(h.ctx.roles.get(&role).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_role_code_and_references() {
    let h = harness();
    role_with_menus(&h, "operator", vec![]).await;

    let duplicate = h
        .ctx
        .roles
        .create(CreateRoleCommand {
            code: "operator".to_string(),
            name: "Again".to_string(),
            ..Default::default()
        })
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let missing_menu = h
        .ctx
        .roles
        .create(CreateRoleCommand {
            code: "other".to_string(),
            name: "Other".to_string(),
            menu_ids: vec![MenuId::new()],
            ..Default::default()
        })
        .await;
    assert!(matches!(missing_menu, Err(AppError::NotFound(_))));

    let page = h
        .ctx
        .roles
        .query(&RoleFilter::default(), &Pagination::new(1, 10))
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].code, "operator");
}

#[tokio::test]
async fn test_permission_lifecycle() {
    let h = harness();

    let permission = h
        .ctx
        .permissions
        .create(CreatePermissionCommand {
            name: "Read menus".to_string(),
            slug: "menu:read".to_string(),
            http_method: "get".to_string(),
            http_path: "/api/v1/menus/*".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(permission.matches("GET", "/api/v1/menus/42"));

    let duplicate = h
        .ctx
        .permissions
        .create(CreatePermissionCommand {
            name: "Again".to_string(),
            slug: "menu:read".to_string(),
            http_method: "GET".to_string(),
            http_path: "/api/v1/menus".to_string(),
            ..Default::default()
        })
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let role = h
        .ctx
        .roles
        .create(CreateRoleCommand {
            code: "reader".to_string(),
            name: "Reader".to_string(),
            permission_ids: vec![permission.id],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(role.permission_ids, vec![permission.id]);

    let updated = h
        .ctx
        .permissions
        .update(
            &permission.id,
            UpdatePermissionCommand {
                name: "Write menus".to_string(),
                slug: "menu:write".to_string(),
                http_method: "POST".to_string(),
                http_path: "/api/v1/menus".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.slug, "menu:write");

    h.ctx.permissions.delete(&permission.id).await.unwrap();
    assert!(h.ctx.roles.get(&role.role.id).await.unwrap().permission_ids.is_empty());
    assert!(matches!(
        h.ctx.permissions.get(&permission.id).await,
        Err(AppError::NotFound(_))
    ));

    let page = h
        .ctx
        .permissions
        .query(&PermissionFilter::default(), &Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}
