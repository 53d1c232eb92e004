//! GraphQL documents sent to the GitHub API.

pub const SEARCH_REPOSITORIES: &str = r#"
query SearchRepositories($query: String!, $first: Int!, $after: String) {
  search(query: $query, type: REPOSITORY, first: $first, after: $after) {
    repositoryCount
    pageInfo {
      hasNextPage
      endCursor
    }
    edges {
      node {
        __typename
        ... on Repository {
          id
          name
          nameWithOwner
          description
          stargazerCount
          forkCount
          url
          owner {
            login
            avatarUrl
          }
          primaryLanguage {
            name
            color
          }
        }
      }
    }
  }
}
"#;

pub const REPOSITORY_DETAILS: &str = r#"
query GetRepositoryDetails($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    id
    name
    nameWithOwner
    description
    stargazerCount
    forkCount
    url
    homepageUrl
    createdAt
    updatedAt
    owner {
      login
      avatarUrl
    }
    primaryLanguage {
      name
      color
    }
    watchers {
      totalCount
    }
    issues(states: OPEN) {
      totalCount
    }
    pullRequests(states: OPEN) {
      totalCount
    }
    licenseInfo {
      name
    }
    languages(first: 10, orderBy: { field: SIZE, direction: DESC }) {
      edges {
        size
        node {
          name
          color
        }
      }
    }
  }
}
"#;
