use cucumber::World;
use cucumber_tests::features::world::TagGroupWorld;

#[tokio::main]
async fn main() {
    TagGroupWorld::cucumber().run_and_exit("features/").await;
}
