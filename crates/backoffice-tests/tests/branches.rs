//! Branch and client management endpoint tests.

use backoffice_client::{BranchModel, CreateBranchRequest, CreateClientRequest};
use backoffice_tests::{connect_or_skip, unique_name};

#[tokio::test]
async fn test_branch_lifecycle() {
    let Some(client) = connect_or_skip().await else {
        return;
    };

    let name = unique_name("branch");
    let created = client
        .create_branch(&CreateBranchRequest {
            name: name.clone(),
            model: BranchModel::Branch,
            control_branch_id: None,
            activated_on: None,
        })
        .await
        .expect("Failed to create branch");

    assert_eq!(created.name, name);
    assert_eq!(created.model, BranchModel::Branch);

    let fetched = client
        .get_branch(created.id)
        .await
        .expect("Failed to get branch");
    assert_eq!(fetched.id, created.id);

    let listed = client.list_branches().await.expect("Failed to list");
    assert!(listed.branches.iter().any(|b| b.id == created.id));

    client
        .delete_branch(created.id)
        .await
        .expect("Failed to delete branch");

    assert!(client.get_branch(created.id).await.is_err());
}

#[tokio::test]
async fn test_descendants_include_root_and_child() {
    let Some(client) = connect_or_skip().await else {
        return;
    };

    let parent = client
        .create_branch(&CreateBranchRequest {
            name: unique_name("parent"),
            model: BranchModel::Branch,
            control_branch_id: None,
            activated_on: None,
        })
        .await
        .expect("Failed to create parent");

    let child = client
        .create_branch(&CreateBranchRequest {
            name: unique_name("child"),
            model: BranchModel::Franchise,
            control_branch_id: Some(parent.id),
            activated_on: None,
        })
        .await
        .expect("Failed to create child");

    let descendants = client
        .get_branch_descendants(parent.id)
        .await
        .expect("Failed to get descendants");

    assert_eq!(descendants.branch_id, parent.id);
    assert!(descendants.descendant_ids.contains(&parent.id));
    assert!(descendants.descendant_ids.contains(&child.id));

    // Leaf branch resolves to just itself
    let leaf = client
        .get_branch_descendants(child.id)
        .await
        .expect("Failed to get leaf descendants");
    assert_eq!(leaf.descendant_ids, vec![child.id]);
}

#[tokio::test]
async fn test_create_branch_with_unknown_parent_rejected() {
    let Some(client) = connect_or_skip().await else {
        return;
    };

    let result = client
        .create_branch(&CreateBranchRequest {
            name: unique_name("orphan"),
            model: BranchModel::Franchise,
            control_branch_id: Some(i64::MAX),
            activated_on: None,
        })
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_client_lifecycle() {
    let Some(client) = connect_or_skip().await else {
        return;
    };

    let branch = client
        .create_branch(&CreateBranchRequest {
            name: unique_name("branch"),
            model: BranchModel::Branch,
            control_branch_id: None,
            activated_on: None,
        })
        .await
        .expect("Failed to create branch");

    let code = unique_name("CL");
    let created = client
        .create_client(&CreateClientRequest {
            code: code.clone(),
            name: unique_name("client"),
            branch_id: branch.id,
            activated_on: None,
        })
        .await
        .expect("Failed to create client");

    assert_eq!(created.code, code);
    assert_eq!(created.branch_id, branch.id);
    // Never traded
    assert!(created.not_traded_days.is_none());

    let listed = client
        .list_clients(Some(branch.id))
        .await
        .expect("Failed to list clients");
    assert!(listed.clients.iter().any(|c| c.id == created.id));

    client
        .delete_client(created.id)
        .await
        .expect("Failed to delete client");
    assert!(client.get_client(created.id).await.is_err());
}
