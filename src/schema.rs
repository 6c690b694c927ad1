// Diesel table definitions.
// Kept in sync by hand with the cetane migrations in `crate::migrations`.

diesel::table! {
    files (id) {
        id -> Integer,
        filename -> Text,
        impression_type -> Text,
        timestamp -> Text,
        directory -> Text,
        sample_rate -> Nullable<Integer>,
        status -> Text,
        consumed_events -> Nullable<Integer>,
        ignored_events -> Nullable<Integer>,
        invalid_events -> Nullable<Integer>,
    }
}

diesel::table! {
    projects (id) {
        id -> Integer,
        code -> Text,
    }
}

diesel::table! {
    languages (id) {
        id -> Integer,
        code -> Text,
    }
}

diesel::table! {
    countries (id) {
        id -> Integer,
        code -> Text,
    }
}

diesel::table! {
    banner_impressions (id) {
        id -> Integer,
        timestamp -> Text,
        banner -> Text,
        campaign -> Text,
        project_id -> Integer,
        language_id -> Integer,
        country_id -> Integer,
        event_count -> Double,
    }
}

diesel::table! {
    banner_impression_files (id) {
        id -> Integer,
        file_id -> Integer,
        banner_impression_id -> Integer,
        event_count -> Double,
    }
}

diesel::table! {
    landing_page_impressions_raw (id) {
        id -> Integer,
        timestamp -> Text,
        utm_source -> Text,
        utm_campaign -> Text,
        utm_medium -> Text,
        utm_key -> Text,
        landingpage -> Text,
        project_id -> Integer,
        language_id -> Integer,
        country_id -> Integer,
        file_id -> Integer,
    }
}

diesel::table! {
    donatewiki_unique (id) {
        id -> Integer,
        timestamp -> Text,
        utm_source -> Text,
        utm_campaign -> Text,
        contact_id -> Text,
        link_id -> Text,
        file_id -> Integer,
    }
}

diesel::joinable!(banner_impression_files -> files (file_id));
diesel::joinable!(banner_impression_files -> banner_impressions (banner_impression_id));
diesel::joinable!(banner_impressions -> projects (project_id));
diesel::joinable!(banner_impressions -> languages (language_id));
diesel::joinable!(banner_impressions -> countries (country_id));
diesel::joinable!(landing_page_impressions_raw -> files (file_id));
diesel::joinable!(donatewiki_unique -> files (file_id));

diesel::allow_tables_to_appear_in_same_query!(
    files,
    projects,
    languages,
    countries,
    banner_impressions,
    banner_impression_files,
    landing_page_impressions_raw,
    donatewiki_unique,
);
